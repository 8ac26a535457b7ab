use serde::{Serialize, Deserialize};
use std::str::FromStr;

use crate::error::Error;
use crate::layers::param::Param;
use crate::optim::adam::Adam;
use crate::optim::sgd::Sgd;

/// Learning rate used when no optimizer is configured.
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;

/// A configured optimizer: hyperparameters only, no running state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Adam {
        learning_rate: f64,
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    Sgd {
        learning_rate: f64,
    },
}

fn default_beta1() -> f64 { 0.9 }
fn default_beta2() -> f64 { 0.999 }
fn default_epsilon() -> f64 { 1e-7 }

impl OptimizerConfig {
    pub fn adam(learning_rate: f64) -> OptimizerConfig {
        OptimizerConfig::Adam {
            learning_rate,
            beta1: default_beta1(),
            beta2: default_beta2(),
            epsilon: default_epsilon(),
        }
    }

    pub fn sgd(learning_rate: f64) -> OptimizerConfig {
        OptimizerConfig::Sgd { learning_rate }
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            OptimizerConfig::Adam { learning_rate, .. } => *learning_rate,
            OptimizerConfig::Sgd { learning_rate } => *learning_rate,
        }
    }

    /// Creates a fresh optimizer with empty state.
    pub fn build(&self) -> Optimizer {
        match self {
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                Optimizer::Adam(Adam::new(*learning_rate, *beta1, *beta2, *epsilon))
            }
            OptimizerConfig::Sgd { learning_rate } => Optimizer::Sgd(Sgd::new(*learning_rate)),
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::adam(DEFAULT_LEARNING_RATE)
    }
}

impl FromStr for OptimizerConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adam" => Ok(OptimizerConfig::adam(DEFAULT_LEARNING_RATE)),
            "sgd" => Ok(OptimizerConfig::sgd(0.01)),
            other => Err(Error::config(format!("unknown optimizer '{other}'"))),
        }
    }
}

/// Optimizer setting as written in a configuration: an identifier such as
/// `"adam"`, or a fully configured optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptimizerSpec {
    Name(String),
    Configured(OptimizerConfig),
}

impl OptimizerSpec {
    /// `None` resolves to Adam with the default learning rate; a configured
    /// optimizer is returned unmodified.
    pub fn resolve(spec: Option<&OptimizerSpec>) -> Result<OptimizerConfig, Error> {
        match spec {
            None => Ok(OptimizerConfig::default()),
            Some(OptimizerSpec::Name(name)) => name.parse(),
            Some(OptimizerSpec::Configured(cfg)) => Ok(cfg.clone()),
        }
    }
}

impl From<OptimizerConfig> for OptimizerSpec {
    fn from(cfg: OptimizerConfig) -> Self {
        OptimizerSpec::Configured(cfg)
    }
}

impl From<&str> for OptimizerSpec {
    fn from(name: &str) -> Self {
        OptimizerSpec::Name(name.to_string())
    }
}

/// Optimizer with its running state, owned by one training run.
pub enum Optimizer {
    Adam(Adam),
    Sgd(Sgd),
}

impl Optimizer {
    pub fn step(&mut self, params: &mut [&mut Param]) {
        match self {
            Optimizer::Adam(opt) => opt.step(params),
            Optimizer::Sgd(opt) => opt.step(params),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        match self {
            Optimizer::Adam(opt) => opt.learning_rate,
            Optimizer::Sgd(opt) => opt.learning_rate,
        }
    }

    pub fn set_learning_rate(&mut self, lr: f64) {
        match self {
            Optimizer::Adam(opt) => opt.learning_rate = lr,
            Optimizer::Sgd(opt) => opt.learning_rate = lr,
        }
    }
}
