pub mod adam;
pub mod optimizer;
pub mod sgd;

pub use adam::Adam;
pub use optimizer::{Optimizer, OptimizerConfig, OptimizerSpec, DEFAULT_LEARNING_RATE};
pub use sgd::Sgd;
