//! Hooks run by `train_loop` around each epoch.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::autoencoder::AutoEncoder;
use crate::train::epoch_stats::EpochStats;

/// Mutable training state visible to callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingContext {
    /// Learning rate for the next epoch; callbacks may lower it.
    pub learning_rate: f64,
    /// Set to `true` to end training after the current epoch.
    pub stop_training: bool,
}

pub trait Callback {
    fn name(&self) -> &str;

    fn on_train_begin(&mut self, _ctx: &mut TrainingContext) -> Result<()> {
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        _stats: &EpochStats,
        _model: &AutoEncoder,
        _ctx: &mut TrainingContext,
    ) -> Result<()> {
        Ok(())
    }

    fn on_train_end(&mut self, _model: &AutoEncoder, _ctx: &mut TrainingContext) -> Result<()> {
        Ok(())
    }
}

/// Halves (by default) the learning rate after `patience` epochs without
/// improvement of the monitored quantity, never going below `min_lr`.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    pub monitor: String,
    pub factor: f64,
    pub patience: usize,
    pub min_lr: f64,
    pub min_delta: f64,
    best: f64,
    wait: usize,
}

impl ReduceLrOnPlateau {
    pub fn new(monitor: impl Into<String>, factor: f64, patience: usize, min_lr: f64) -> Self {
        ReduceLrOnPlateau {
            monitor: monitor.into(),
            factor,
            patience,
            min_lr,
            min_delta: 1e-4,
            best: f64::INFINITY,
            wait: 0,
        }
    }
}

impl Default for ReduceLrOnPlateau {
    fn default() -> Self {
        ReduceLrOnPlateau::new("loss", 0.5, 50, 1e-4)
    }
}

impl Callback for ReduceLrOnPlateau {
    fn name(&self) -> &str {
        "reduce_lr_on_plateau"
    }

    fn on_train_begin(&mut self, _ctx: &mut TrainingContext) -> Result<()> {
        self.best = f64::INFINITY;
        self.wait = 0;
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        stats: &EpochStats,
        _model: &AutoEncoder,
        ctx: &mut TrainingContext,
    ) -> Result<()> {
        let current = match stats.monitored(&self.monitor) {
            Some(v) => v,
            None => {
                warn!(monitor = %self.monitor, "monitored quantity not available, skipping");
                return Ok(());
            }
        };
        if current < self.best - self.min_delta {
            self.best = current;
            self.wait = 0;
            return Ok(());
        }
        self.wait += 1;
        if self.wait >= self.patience && ctx.learning_rate > self.min_lr {
            let new_lr = (ctx.learning_rate * self.factor).max(self.min_lr);
            info!(epoch = stats.epoch, from = ctx.learning_rate, to = new_lr, "reducing learning rate");
            ctx.learning_rate = new_lr;
            self.wait = 0;
        }
        Ok(())
    }
}

/// Writes the model to `filepath` at the end of an epoch; with
/// `save_best_only` only when the monitored quantity improved.
#[derive(Debug, Clone)]
pub struct ModelCheckpoint {
    pub filepath: PathBuf,
    pub monitor: String,
    pub save_best_only: bool,
    best: f64,
}

impl ModelCheckpoint {
    pub fn new(filepath: impl Into<PathBuf>, monitor: impl Into<String>, save_best_only: bool) -> Self {
        ModelCheckpoint {
            filepath: filepath.into(),
            monitor: monitor.into(),
            save_best_only,
            best: f64::INFINITY,
        }
    }
}

impl Callback for ModelCheckpoint {
    fn name(&self) -> &str {
        "model_checkpoint"
    }

    fn on_train_begin(&mut self, _ctx: &mut TrainingContext) -> Result<()> {
        self.best = f64::INFINITY;
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        stats: &EpochStats,
        model: &AutoEncoder,
        _ctx: &mut TrainingContext,
    ) -> Result<()> {
        if !self.save_best_only {
            return model.save_json(&self.filepath);
        }
        match stats.monitored(&self.monitor) {
            // NaN never compares as an improvement
            Some(current) if current < self.best => {
                debug!(epoch = stats.epoch, current, path = %self.filepath.display(), "saving best model");
                self.best = current;
                model.save_json(&self.filepath)
            }
            Some(_) => Ok(()),
            None => {
                warn!(monitor = %self.monitor, "monitored quantity not available, skipping checkpoint");
                Ok(())
            }
        }
    }
}
