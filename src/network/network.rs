use serde::{Serialize, Deserialize};

use crate::layers::{Layer, Param};
use crate::math::matrix::Matrix;

/// A named stack of layers applied in order; the encoder and the decoder
/// halves of the auto-encoder are each one `Network`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub layers: Vec<Layer>,
    #[serde(skip)]
    input_rows: Vec<usize>,
}

impl Network {
    pub fn new(name: impl Into<String>, layers: Vec<Layer>) -> Network {
        Network { name: name.into(), layers, input_rows: Vec::new() }
    }

    /// Inference pass; does not touch any cached state.
    pub fn predict(&self, input: &Matrix) -> Matrix {
        let mut current = input.clone();
        for layer in &self.layers {
            current = layer.predict(&current);
        }
        current
    }

    /// Forward pass; stores activations in each layer for backprop.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        self.input_rows.clear();
        let mut current = input.clone();
        for layer in &mut self.layers {
            self.input_rows.push(current.rows);
            current = layer.forward(&current);
        }
        current
    }

    /// Propagates ∂L/∂output back through every layer, accumulating
    /// parameter gradients, and returns ∂L/∂input.
    pub fn backward(&mut self, grad: &Matrix) -> Matrix {
        let mut delta = grad.clone();
        for (i, layer) in self.layers.iter_mut().enumerate().rev() {
            let rows = self.input_rows.get(i).copied().unwrap_or(0);
            delta = layer.backward(&delta, rows);
        }
        delta
    }

    pub fn output_shape(&self, input: (usize, usize)) -> (usize, usize) {
        self.layers.iter().fold(input, |shape, layer| layer.output_shape(shape))
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        self.layers.iter_mut().flat_map(|l| l.params_mut()).collect()
    }

    pub fn params(&self) -> Vec<&Param> {
        self.layers.iter().flat_map(|l| l.params()).collect()
    }

    pub fn param_count(&self) -> usize {
        self.layers.iter().map(|l| l.param_count()).sum()
    }

    pub fn clear_cache(&mut self) {
        self.input_rows = Vec::new();
        for layer in &mut self.layers {
            layer.clear_cache();
        }
    }

    /// True while any layer still holds activations from `forward`.
    pub fn has_cache(&self) -> bool {
        !self.input_rows.is_empty() || self.layers.iter().any(Layer::has_cache)
    }
}
