use std::path::Path;

use tracing::{info, warn};

use crate::cluster::kmeans::KMeans;
use crate::cluster::Clusterer;
use crate::clusterer::checkpoint::{checkpoint_path, resolve_checkpoint, unique_token};
use crate::clusterer::config::AeBiGruConfig;
use crate::clusterer::latent::encode;
use crate::clusterer::random::RandomState;
use crate::clusterer::state::FittedState;
use crate::data::batch::TimeSeriesBatch;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;
use crate::model::assembler::{assemble, CompileSettings};
use crate::model::autoencoder::AutoEncoder;
use crate::network::builder::AeBiGruNetwork;
use crate::train::callbacks::{Callback, ModelCheckpoint, ReduceLrOnPlateau};
use crate::train::epoch_stats::History;
use crate::train::loop_fn::train_loop;
use crate::train::train_config::{effective_batch_size, TrainConfig};

/// Clusters multivariate time series in the latent space of a bidirectional
/// GRU auto-encoder.
///
/// `fit` trains the auto-encoder to reconstruct its input, keeps the best
/// checkpoint, encodes the training data and fits `C` on the codes.
/// Inference (`transform`, `predict`, `score`) only reads the fitted state.
///
/// Input batches are `(case, channel, timepoint)`; the channel and timepoint
/// counts seen by `fit` are required for every later call.
pub struct AeBiGruClusterer<C = KMeans> {
    config: AeBiGruConfig,
    estimator: C,
    random_state: RandomState,
    callbacks: Option<Vec<Box<dyn Callback>>>,
    /// Gives an unseeded estimator the seed drawn for each fit.
    seed_estimator: Option<fn(&mut C, u64)>,
    fitted: Option<FittedState<C>>,
}

fn seed_kmeans(kmeans: &mut KMeans, seed: u64) {
    kmeans.seed.get_or_insert(seed);
}

impl AeBiGruClusterer<KMeans> {
    /// Uses k-means with `n_clusters` (2 by default) on the latent codes.
    pub fn new(config: AeBiGruConfig) -> Result<Self> {
        config.validate()?;
        let mut kmeans = KMeans::new(config.n_clusters.unwrap_or(2));
        if let Some(params) = &config.clustering_params {
            warn!("clustering_params is deprecated, pass a configured estimator instead");
            kmeans = kmeans.with_params(params);
        }
        if let Some(seed) = config.random_state {
            kmeans = kmeans.with_seed(seed);
        }
        let mut clst = AeBiGruClusterer::build(config, kmeans);
        clst.seed_estimator = Some(seed_kmeans);
        Ok(clst)
    }
}

impl<C: Clusterer + Clone> AeBiGruClusterer<C> {
    /// Uses `estimator` on the latent codes. It is cloned for every fit, so
    /// the value passed here stays unfitted.
    pub fn with_estimator(config: AeBiGruConfig, estimator: C) -> Result<Self> {
        config.validate()?;
        if config.n_clusters.is_some() || config.clustering_params.is_some() {
            warn!("n_clusters and clustering_params are ignored when an estimator is supplied");
        }
        Ok(AeBiGruClusterer::build(config, estimator))
    }

    fn build(config: AeBiGruConfig, estimator: C) -> Self {
        let random_state = RandomState::from(config.random_state);
        AeBiGruClusterer { config, estimator, random_state, callbacks: None, seed_estimator: None, fitted: None }
    }

    pub fn with_random_state(mut self, random_state: RandomState) -> Self {
        self.random_state = random_state;
        self
    }

    /// Replaces the default learning-rate schedule with `callbacks`. A
    /// best-model checkpoint callback is always appended.
    pub fn with_callbacks(mut self, callbacks: Vec<Box<dyn Callback>>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    pub fn config(&self) -> &AeBiGruConfig {
        &self.config
    }

    pub fn network(&self) -> AeBiGruNetwork {
        AeBiGruNetwork::new(self.config.network_config())
    }

    /// Builds and compiles an untrained auto-encoder for
    /// `(n_timepoints, n_channels)` with weights drawn from `seed`.
    pub fn build_model(&self, input_shape: (usize, usize), seed: u64) -> Result<AutoEncoder> {
        let settings = CompileSettings {
            loss: &self.config.loss,
            metrics: self.config.metrics.as_ref(),
            optimizer: self.config.optimizer.as_ref(),
        };
        assemble(&self.network(), input_shape, &settings, seed)
    }

    // ── Fitted state ──────────────────────────────────────────────────────

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn fitted(&self) -> Option<&FittedState<C>> {
        self.fitted.as_ref()
    }

    fn state(&self, method: &'static str) -> Result<&FittedState<C>> {
        self.fitted.as_ref().ok_or(Error::NotFitted(method))
    }

    pub fn model(&self) -> Result<&AutoEncoder> {
        Ok(&self.state("model")?.model)
    }

    pub fn training_model(&self) -> Result<&AutoEncoder> {
        Ok(&self.state("training_model")?.training_model)
    }

    pub fn history(&self) -> Result<&History> {
        Ok(&self.state("history")?.history)
    }

    /// The clusterer fitted on the training codes.
    pub fn estimator(&self) -> Result<&C> {
        Ok(&self.state("estimator")?.estimator)
    }

    // ── Fit ───────────────────────────────────────────────────────────────

    /// Trains the auto-encoder on `x` and fits the clusterer on its latent
    /// codes. Any error leaves the estimator unfitted.
    pub fn fit(&mut self, x: &TimeSeriesBatch) -> Result<&mut Self> {
        self.fitted = None;

        let sequences = x.to_sequences();
        let input_shape = sequences.sample_shape();
        let seed = self.random_state.draw_seed();
        info!(n_cases = sequences.len(), input_shape = ?input_shape, seed, "fitting auto-encoder clusterer");

        let mut training_model = self.build_model(input_shape, seed)?;
        if self.config.verbose {
            for line in training_model.summary() {
                info!("{line}");
            }
        }

        let batch_size = effective_batch_size(
            sequences.len(),
            self.config.batch_size,
            self.config.use_mini_batch_size,
        );
        let file_name = if self.config.save_best_model {
            self.config.best_file_name.clone()
        } else {
            unique_token()
        };
        let best_path = checkpoint_path(&self.config.file_path, &file_name);

        let user_callbacks = self.callbacks.take();
        let has_user_callbacks = user_callbacks.is_some();
        let mut callbacks: Vec<Box<dyn Callback>> = match user_callbacks {
            Some(list) => list,
            None => vec![Box::new(ReduceLrOnPlateau::default())],
        };
        let n_kept = callbacks.len();
        callbacks.push(Box::new(ModelCheckpoint::new(&best_path, "loss", true)));

        let train_config = TrainConfig::new(self.config.n_epochs, batch_size, seed)
            .verbose(self.config.verbose);
        let trained = train_loop(
            &mut training_model,
            sequences.samples(),
            sequences.samples(),
            &train_config,
            &mut callbacks,
        );

        callbacks.truncate(n_kept);
        if has_user_callbacks {
            self.callbacks = Some(callbacks);
        }
        let history = match trained {
            Ok(history) => history,
            Err(err) => {
                if !self.config.save_best_model && best_path.is_file() {
                    if let Err(e) = std::fs::remove_file(&best_path) {
                        warn!(path = %best_path.display(), error = %e, "could not remove checkpoint after failed training");
                    }
                }
                return Err(err);
            }
        };

        let resolution = resolve_checkpoint(&best_path, &training_model, self.config.save_best_model)?;
        let loaded_from_checkpoint = resolution.is_loaded();
        let mut model = resolution.into_model();

        if self.config.save_last_model {
            let last_path = checkpoint_path(&self.config.file_path, &self.config.last_file_name);
            training_model.save_json(&last_path)?;
            info!(path = %last_path.display(), "saved last-epoch model");
        }

        let latent = encode(&model, sequences.samples())?;
        let mut estimator = self.estimator.clone();
        if let Some(seed_estimator) = self.seed_estimator {
            seed_estimator(&mut estimator, seed);
        }
        estimator.fit(&latent)?;
        info!(n_codes = latent.rows, code_dim = latent.cols, "fitted clusterer on latent codes");

        drop(latent);
        drop(sequences);
        training_model.release_buffers();
        model.release_buffers();

        self.fitted = Some(FittedState {
            training_model,
            model,
            input_shape,
            estimator,
            history,
            random_state: Some(seed),
            file_name: Some(file_name),
            loaded_from_checkpoint,
        });
        Ok(self)
    }

    // ── Inference ─────────────────────────────────────────────────────────

    /// Latent codes of `x`, one row per case.
    pub fn transform(&self, x: &TimeSeriesBatch) -> Result<Matrix> {
        let state = self.state("transform")?;
        let (_, n_channels, n_timepoints) = x.shape();
        let (fit_timepoints, fit_channels) = state.input_shape;
        if (n_channels, n_timepoints) != (fit_channels, fit_timepoints) {
            return Err(Error::ShapeMismatch {
                expected: vec![fit_channels, fit_timepoints],
                got: vec![n_channels, n_timepoints],
            });
        }
        encode(&state.model, x.to_sequences().samples())
    }

    /// Cluster label of every case.
    pub fn predict(&self, x: &TimeSeriesBatch) -> Result<Vec<usize>> {
        let latent = self.transform(x)?;
        self.state("predict")?.estimator.predict(&latent)
    }

    /// The fitted clusterer's score of the latent codes of `x`.
    pub fn score(&self, x: &TimeSeriesBatch) -> Result<f64> {
        let latent = self.transform(x)?;
        self.state("score")?.estimator.score(&latent)
    }

    /// Installs a previously saved auto-encoder and an already fitted
    /// clusterer, skipping training.
    pub fn load_pretrained(&mut self, path: impl AsRef<Path>, estimator: C) -> Result<&mut Self> {
        self.fitted = None;
        let model = AutoEncoder::load_json(path.as_ref())?.into_uncompiled();
        model.encoder()?;
        let input_shape = model.input_shape()?;
        info!(path = %path.as_ref().display(), input_shape = ?input_shape, "loaded pretrained auto-encoder");

        self.fitted = Some(FittedState {
            training_model: model.clone(),
            model,
            input_shape,
            estimator,
            history: History::default(),
            random_state: None,
            file_name: None,
            loaded_from_checkpoint: true,
        });
        Ok(self)
    }
}
