use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;

/// Fully connected layer applied independently to every row of its input,
/// so a `(1, n)` vector and a `(timepoints, n)` sequence both work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub units: usize,
    pub input_size: usize,
    pub weights: Param,
    pub biases: Param,
    pub activator: ActivationFunction,
    #[serde(skip)]
    cache: Option<DenseCache>,
}

#[derive(Debug, Clone)]
struct DenseCache {
    input: Matrix,
    // pre-activation values (z = xW + b) needed for correct derivative
    pre: Matrix,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        units: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Dense {
        Dense {
            units,
            input_size,
            weights: Param::new(Matrix::glorot_uniform(input_size, units, rng)),
            biases: Param::zeros(1, units),
            activator: activation,
            cache: None,
        }
    }

    fn pre_activation(&self, input: &Matrix) -> Matrix {
        let bias = self.biases.value.row(0);
        let data = input.data.iter()
            .map(|x| {
                let mut z = self.weights.value.left_mul(x);
                for (zi, b) in z.iter_mut().zip(bias.iter()) {
                    *zi += b;
                }
                z
            })
            .collect();
        Matrix { rows: input.rows, cols: self.units, data }
    }

    /// Inference-only forward pass; leaves the layer untouched.
    pub fn predict(&self, input: &Matrix) -> Matrix {
        self.pre_activation(input).map(|x| self.activator.function(x))
    }

    /// Training forward pass; stores what `backward` needs.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        let pre = self.pre_activation(input);
        let out = pre.map(|x| self.activator.function(x));
        self.cache = Some(DenseCache { input: input.clone(), pre });
        out
    }

    /// Accumulates parameter gradients and returns ∂L/∂input.
    /// `grad` is ∂L/∂output, same shape as the last forward output.
    pub fn backward(&mut self, grad: &Matrix) -> Matrix {
        let cache = match self.cache.as_ref() {
            Some(c) => c,
            None => return Matrix::zeros(grad.rows, self.input_size),
        };
        let mut grad_input = Matrix::zeros(cache.input.rows, self.input_size);
        for t in 0..grad.rows {
            // δ = error ⊙ σ'(z)
            let delta: Vec<f64> = grad.row(t).iter()
                .zip(cache.pre.row(t).iter())
                .map(|(g, z)| g * self.activator.derivative(*z))
                .collect();
            self.weights.grad.add_outer(cache.input.row(t), &delta);
            self.biases.grad.add_to_row(0, &delta);
            grad_input.data[t] = self.weights.value.right_mul_t(&delta);
        }
        grad_input
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }

    pub fn param_count(&self) -> usize {
        self.weights.count() + self.biases.count()
    }

    pub fn params(&self) -> Vec<&Param> {
        vec![&self.weights, &self.biases]
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn applies_to_every_row() {
        let mut rng = StdRng::seed_from_u64(1);
        let dense = Dense::new(3, 2, ActivationFunction::Identity, &mut rng);
        let seq = Matrix::from_data(vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
        let out = dense.predict(&seq);
        assert_eq!(out.shape(), (2, 2));
        assert_eq!(out.row(0), dense.weights.value.row(0));
        assert_eq!(out.row(1), dense.weights.value.row(1));
    }

    #[test]
    fn weight_gradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut dense = Dense::new(2, 2, ActivationFunction::Tanh, &mut rng);
        let x = Matrix::from_data(vec![vec![0.5, -0.2], vec![0.1, 0.4]]);
        // L = sum(output)
        let loss = |d: &Dense| d.predict(&x).flatten().iter().sum::<f64>();

        let out = dense.forward(&x);
        dense.weights.zero_grad();
        dense.biases.zero_grad();
        dense.backward(&Matrix::from_data(vec![vec![1.0; 2]; out.rows]));

        let eps = 1e-6;
        let analytic = dense.weights.grad.data[1][0];
        let mut plus = dense.clone();
        plus.weights.value.data[1][0] += eps;
        let mut minus = dense.clone();
        minus.weights.value.data[1][0] -= eps;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        assert!((analytic - numeric).abs() < 1e-6);
    }
}
