pub mod dense;
pub mod gru;
pub mod param;
pub mod repeat;

use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

pub use dense::Dense;
pub use gru::{BiGru, Gru};
pub use param::Param;
pub use repeat::RepeatVector;

/// One layer of a sequential sub-network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    BiGru(BiGru),
    Dense(Dense),
    RepeatVector(RepeatVector),
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::BiGru(_) => "bidirectional_gru",
            Layer::Dense(_) => "dense",
            Layer::RepeatVector(_) => "repeat_vector",
        }
    }

    pub fn predict(&self, input: &Matrix) -> Matrix {
        match self {
            Layer::BiGru(l) => l.predict(input),
            Layer::Dense(l) => l.predict(input),
            Layer::RepeatVector(l) => l.predict(input),
        }
    }

    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        match self {
            Layer::BiGru(l) => l.forward(input),
            Layer::Dense(l) => l.forward(input),
            Layer::RepeatVector(l) => l.predict(input),
        }
    }

    /// `input_rows` is the row count of the input seen by the last `forward`.
    pub fn backward(&mut self, grad: &Matrix, input_rows: usize) -> Matrix {
        match self {
            Layer::BiGru(l) => l.backward(grad, input_rows),
            Layer::Dense(l) => l.backward(grad),
            Layer::RepeatVector(l) => l.backward(grad),
        }
    }

    /// Output shape for a given `(rows, cols)` input shape.
    pub fn output_shape(&self, input: (usize, usize)) -> (usize, usize) {
        match self {
            Layer::BiGru(l) if l.return_sequences => (input.0, l.output_size()),
            Layer::BiGru(l) => (1, l.output_size()),
            Layer::Dense(l) => (input.0, l.units),
            Layer::RepeatVector(l) => (l.times, input.1),
        }
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        match self {
            Layer::BiGru(l) => l.params_mut(),
            Layer::Dense(l) => l.params_mut(),
            Layer::RepeatVector(_) => Vec::new(),
        }
    }

    pub fn params(&self) -> Vec<&Param> {
        match self {
            Layer::BiGru(l) => l.params(),
            Layer::Dense(l) => l.params(),
            Layer::RepeatVector(_) => Vec::new(),
        }
    }

    pub fn param_count(&self) -> usize {
        match self {
            Layer::BiGru(l) => l.param_count(),
            Layer::Dense(l) => l.param_count(),
            Layer::RepeatVector(_) => 0,
        }
    }

    pub fn clear_cache(&mut self) {
        match self {
            Layer::BiGru(l) => l.clear_cache(),
            Layer::Dense(l) => l.clear_cache(),
            Layer::RepeatVector(_) => {}
        }
    }

    pub fn has_cache(&self) -> bool {
        match self {
            Layer::BiGru(l) => l.has_cache(),
            Layer::Dense(l) => l.has_cache(),
            Layer::RepeatVector(_) => false,
        }
    }
}
