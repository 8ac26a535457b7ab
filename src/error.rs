//! Error types shared by the network core, the training loop and the
//! clustering estimator.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, training or querying a model.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid construction-time or compile-time configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input dimensions disagree with what a layer or fitted estimator expects.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// Input contained no cases.
    #[error("empty input data")]
    EmptyData,

    /// An inference call was made before `fit`.
    #[error("estimator must be fitted before calling {0}")]
    NotFitted(&'static str),

    /// The training loop was started on a model without a compile step.
    #[error("model must be compiled before training")]
    NotCompiled,

    /// The assembled model does not have the expected layer ordering.
    #[error("model layout error: {0}")]
    Layout(String),

    /// The training engine could not complete a fit.
    #[error("training failed: {0}")]
    Training(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }
}
