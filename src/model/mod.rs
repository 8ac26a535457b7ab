pub mod assembler;
pub mod autoencoder;
pub mod compile;

pub use assembler::{assemble, CompileSettings};
pub use autoencoder::{AutoEncoder, ModelLayer, Reshape, ENCODER_INDEX};
pub use compile::{resolve_metrics, CompileConfig, MetricsSpec, DEFAULT_METRIC};
