/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`     — total number of full passes over the training data
/// - `batch_size` — samples per mini-batch; use `1` for online updates
/// - `seed`       — seeds the per-epoch shuffle so a run is reproducible
/// - `verbose`    — log every epoch at `info` instead of `debug`
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub seed: u64,
    pub verbose: bool,
}

impl TrainConfig {
    /// Creates a quiet `TrainConfig`.
    pub fn new(epochs: usize, batch_size: usize, seed: u64) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            seed,
            verbose: false,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Batch size actually used for training.
///
/// With the mini-batch policy on, the batch is a tenth of the dataset,
/// capped by `batch_size` and never below one.
pub fn effective_batch_size(n_cases: usize, batch_size: usize, use_mini_batch_size: bool) -> usize {
    if use_mini_batch_size {
        batch_size.min(n_cases / 10).max(1)
    } else {
        batch_size
    }
}
