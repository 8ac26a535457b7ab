//! The auto-encoder clustering estimator: training orchestration,
//! checkpoint recovery and the latent-space clustering adapter.

pub mod checkpoint;
pub mod config;
pub mod estimator;
pub mod latent;
pub mod random;
pub mod state;

pub use checkpoint::{checkpoint_path, resolve_checkpoint, CheckpointResolution, CHECKPOINT_EXTENSION};
pub use config::AeBiGruConfig;
pub use estimator::AeBiGruClusterer;
pub use latent::encode;
pub use random::RandomState;
pub use state::FittedState;
