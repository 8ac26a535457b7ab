pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod model;
pub mod train;
pub mod data;
pub mod cluster;
pub mod clusterer;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::matrix::Matrix;
pub use activation::activation::{ActivationFunction, ActivationSpec};
pub use network::{AeBiGruNetwork, NetworkConfig, UnitsSpec};
pub use model::{AutoEncoder, MetricsSpec};
pub use optim::{OptimizerConfig, OptimizerSpec};
pub use train::{Callback, EpochStats, History, ModelCheckpoint, ReduceLrOnPlateau, TrainingContext};
pub use data::{SequenceBatch, TimeSeriesBatch};
pub use cluster::{Clusterer, DummyClusterer, DummyStrategy, KMeans, KMeansParams};
pub use clusterer::{AeBiGruClusterer, AeBiGruConfig, RandomState};
