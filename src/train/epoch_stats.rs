use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

/// Per-epoch training statistics emitted by `train_loop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss over all samples in this epoch.
    pub loss: f64,
    /// Mean value of each compiled metric, keyed by the configured name.
    pub metrics: BTreeMap<String, f64>,
    /// Learning rate in effect during this epoch.
    pub learning_rate: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

impl EpochStats {
    /// Value of a monitored quantity: `"loss"` or a metric name.
    pub fn monitored(&self, monitor: &str) -> Option<f64> {
        if monitor == "loss" {
            Some(self.loss)
        } else {
            self.metrics.get(monitor).copied()
        }
    }
}

/// Loss and metric trajectory of one fit, one entry per completed epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub epochs: Vec<EpochStats>,
}

impl History {
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn loss(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.loss).collect()
    }

    /// Per-epoch values of a metric, `None` if it was never recorded.
    pub fn metric(&self, name: &str) -> Option<Vec<f64>> {
        self.epochs.iter().map(|e| e.metrics.get(name).copied()).collect()
    }

    pub fn learning_rate(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.learning_rate).collect()
    }

    /// Lowest training loss reached.
    pub fn best_loss(&self) -> Option<f64> {
        self.epochs.iter().map(|e| e.loss).fold(None, |best, l| match best {
            Some(b) if b <= l => Some(b),
            _ => Some(l),
        })
    }
}
