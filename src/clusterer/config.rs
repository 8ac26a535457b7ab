use serde::{Serialize, Deserialize};
use std::path::Path;

use crate::activation::activation::ActivationSpec;
use crate::cluster::kmeans::KMeansParams;
use crate::error::{Error, Result};
use crate::model::compile::MetricsSpec;
use crate::network::config::{NetworkConfig, UnitsSpec};
use crate::optim::optimizer::OptimizerSpec;

/// Everything about an [`AeBiGruClusterer`](super::AeBiGruClusterer) that can
/// live in a JSON file. The estimator, the extra callbacks and an RNG-backed
/// random state are attached with builder methods instead.
///
/// Missing fields take their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AeBiGruConfig {
    /// Clusters for the default k-means estimator (2 when `None`).
    pub n_clusters: Option<usize>,
    /// Legacy k-means overrides; ignored when an estimator is supplied.
    pub clustering_params: Option<KMeansParams>,
    pub latent_space_dim: usize,
    pub temporal_latent_space: bool,
    pub n_layers: usize,
    pub n_units: Option<UnitsSpec>,
    pub activation: ActivationSpec,
    pub n_epochs: usize,
    pub batch_size: usize,
    pub use_mini_batch_size: bool,
    pub random_state: Option<u64>,
    pub verbose: bool,
    pub loss: String,
    pub metrics: Option<MetricsSpec>,
    pub optimizer: Option<OptimizerSpec>,
    /// Directory prefix for checkpoint files, joined by plain concatenation.
    pub file_path: String,
    pub save_best_model: bool,
    pub save_last_model: bool,
    pub best_file_name: String,
    pub last_file_name: String,
}

impl Default for AeBiGruConfig {
    fn default() -> Self {
        AeBiGruConfig {
            n_clusters: None,
            clustering_params: None,
            latent_space_dim: 128,
            temporal_latent_space: false,
            n_layers: 2,
            n_units: None,
            activation: ActivationSpec::default(),
            n_epochs: 2000,
            batch_size: 32,
            use_mini_batch_size: false,
            random_state: None,
            verbose: false,
            loss: "mse".to_string(),
            metrics: None,
            optimizer: None,
            file_path: "./".to_string(),
            save_best_model: false,
            save_last_model: false,
            best_file_name: "best_model".to_string(),
            last_file_name: "last_file".to_string(),
        }
    }
}

impl AeBiGruConfig {
    /// The network-builder half of the configuration.
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            latent_space_dim: self.latent_space_dim,
            temporal_latent_space: self.temporal_latent_space,
            n_layers: self.n_layers,
            n_units: self.n_units.clone(),
            activation: self.activation.clone(),
        }
    }

    /// Checks the numeric preconditions that do not need the data.
    pub fn validate(&self) -> Result<()> {
        self.network_config().validate()?;
        if self.n_epochs == 0 {
            return Err(Error::config("n_epochs must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if self.n_clusters == Some(0) {
            return Err(Error::config("n_clusters must be at least 1"));
        }
        if self.save_best_model && self.best_file_name.is_empty() {
            return Err(Error::config("best_file_name must not be empty when save_best_model is set"));
        }
        Ok(())
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<AeBiGruConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::optimizer::OptimizerConfig;

    #[test]
    fn empty_json_gives_defaults() {
        let cfg: AeBiGruConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, AeBiGruConfig::default());
        assert_eq!(cfg.latent_space_dim, 128);
        assert_eq!(cfg.n_epochs, 2000);
        assert_eq!(cfg.file_path, "./");
    }

    #[test]
    fn mixed_spec_fields_parse() {
        let cfg: AeBiGruConfig = serde_json::from_str(
            r#"{
                "n_units": [8, 4],
                "activation": ["tanh", "relu"],
                "metrics": ["mse", "mae"],
                "optimizer": {"type": "sgd", "learning_rate": 0.05},
                "clustering_params": {"n_init": 3}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.n_units, Some(UnitsSpec::from(vec![8, 4])));
        assert_eq!(cfg.metrics, Some(MetricsSpec::from(vec!["mse", "mae"])));
        assert_eq!(cfg.optimizer, Some(OptimizerSpec::from(OptimizerConfig::sgd(0.05))));
        assert_eq!(cfg.clustering_params.as_ref().unwrap().n_init, Some(3));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_epochs_or_batch_is_rejected() {
        let cfg = AeBiGruConfig { n_epochs: 0, ..AeBiGruConfig::default() };
        assert!(matches!(cfg.validate(), Err(Error::Configuration(_))));
        let cfg = AeBiGruConfig { batch_size: 0, ..AeBiGruConfig::default() };
        assert!(matches!(cfg.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let cfg = AeBiGruConfig {
            n_clusters: Some(4),
            random_state: Some(11),
            metrics: Some("mae".into()),
            ..AeBiGruConfig::default()
        };
        cfg.save_json(&path).unwrap();
        assert_eq!(AeBiGruConfig::load_json(&path).unwrap(), cfg);
    }
}
