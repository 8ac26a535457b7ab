use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;
use crate::optim::optimizer::OptimizerConfig;

/// Metric list used when none is configured.
pub const DEFAULT_METRIC: &str = "mean_squared_error";

/// Metrics setting as written in a configuration.
///
/// Anything that is neither a string nor a list of strings lands in
/// `Other` and is rejected by [`resolve_metrics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricsSpec {
    Single(String),
    List(Vec<String>),
    Other(serde_json::Value),
}

impl From<&str> for MetricsSpec {
    fn from(name: &str) -> Self {
        MetricsSpec::Single(name.to_string())
    }
}

impl From<Vec<&str>> for MetricsSpec {
    fn from(names: Vec<&str>) -> Self {
        MetricsSpec::List(names.into_iter().map(String::from).collect())
    }
}

impl From<serde_json::Value> for MetricsSpec {
    fn from(value: serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(MetricsSpec::Other(value))
    }
}

/// `None` → `["mean_squared_error"]`, a string → a one-element list, a list
/// → used as-is. Every name must be a known metric.
pub fn resolve_metrics(spec: Option<&MetricsSpec>) -> Result<Vec<String>> {
    let metrics = match spec {
        None => vec![DEFAULT_METRIC.to_string()],
        Some(MetricsSpec::Single(name)) => vec![name.clone()],
        Some(MetricsSpec::List(names)) => names.clone(),
        Some(MetricsSpec::Other(value)) => {
            return Err(Error::config(format!(
                "metrics should be a list, string, or None, got {value}"
            )))
        }
    };
    for name in &metrics {
        name.parse::<LossType>()?;
    }
    Ok(metrics)
}

/// What `compile` attaches to a model: optimizer, loss and metric names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileConfig {
    pub optimizer: OptimizerConfig,
    pub loss: LossType,
    pub metrics: Vec<String>,
}

impl CompileConfig {
    /// Metric names paired with the function that evaluates them.
    pub fn metric_fns(&self) -> Result<Vec<(String, LossType)>> {
        self.metrics.iter()
            .map(|name| Ok((name.clone(), name.parse::<LossType>()?)))
            .collect()
    }
}
