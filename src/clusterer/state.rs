use crate::model::autoencoder::AutoEncoder;
use crate::train::epoch_stats::History;

/// Everything a successful fit produces. Built once at the very end of
/// `fit` and only read afterwards.
#[derive(Debug, Clone)]
pub struct FittedState<C> {
    /// The model as it stood after the last epoch; gradient buffers released.
    pub training_model: AutoEncoder,
    /// Canonical inference model: the best checkpoint, or a copy of
    /// `training_model` when no checkpoint was written.
    pub model: AutoEncoder,
    /// `(n_timepoints, n_channels)` captured from the training data.
    pub input_shape: (usize, usize),
    pub estimator: C,
    pub history: History,
    /// Seed actually used for weight initialisation and shuffling; `None`
    /// for a model loaded with `load_pretrained`.
    pub random_state: Option<u64>,
    /// Checkpoint file name, without directory or extension.
    pub file_name: Option<String>,
    pub loaded_from_checkpoint: bool,
}
