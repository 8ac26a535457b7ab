//! Gated recurrent unit layers.
//!
//! `Gru` runs a single direction over a `(timepoints, features)` sequence
//! and returns every hidden state. `BiGru` wraps two of them, feeding the
//! second one the time-reversed sequence, and concatenates their states.

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::layers::param::Param;
use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gru {
    pub input_size: usize,
    pub units: usize,
    /// Applied to the candidate state.
    pub activator: ActivationFunction,

    // update gate
    w_z: Param,
    u_z: Param,
    b_z: Param,
    // reset gate
    w_r: Param,
    u_r: Param,
    b_r: Param,
    // candidate
    w_n: Param,
    u_n: Param,
    b_n: Param,

    #[serde(skip)]
    cache: Option<Vec<GruStep>>,
}

#[derive(Debug, Clone)]
struct GruStep {
    x: Vec<f64>,
    h_prev: Vec<f64>,
    z: Vec<f64>,
    r: Vec<f64>,
    n: Vec<f64>,
    a_n: Vec<f64>,
    rh: Vec<f64>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn affine(x: &[f64], w: &Param, h: &[f64], u: &Param, b: &Param) -> Vec<f64> {
    let xw = w.value.left_mul(x);
    let hu = u.value.left_mul(h);
    xw.iter()
        .zip(hu.iter())
        .zip(b.value.row(0).iter())
        .map(|((a, c), bias)| a + c + bias)
        .collect()
}

impl Gru {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        units: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Gru {
        let mut kernel = || Param::new(Matrix::glorot_uniform(input_size, units, &mut *rng));
        let (w_z, w_r, w_n) = (kernel(), kernel(), kernel());
        let mut recurrent = || Param::new(Matrix::glorot_uniform(units, units, &mut *rng));
        let (u_z, u_r, u_n) = (recurrent(), recurrent(), recurrent());
        Gru {
            input_size,
            units,
            activator: activation,
            w_z, u_z, b_z: Param::zeros(1, units),
            w_r, u_r, b_r: Param::zeros(1, units),
            w_n, u_n, b_n: Param::zeros(1, units),
            cache: None,
        }
    }

    fn step(&self, x: &[f64], h_prev: &[f64]) -> GruStep {
        // z = σ(x·W_z + h·U_z + b_z), r = σ(x·W_r + h·U_r + b_r)
        let z: Vec<f64> = affine(x, &self.w_z, h_prev, &self.u_z, &self.b_z)
            .into_iter().map(sigmoid).collect();
        let r: Vec<f64> = affine(x, &self.w_r, h_prev, &self.u_r, &self.b_r)
            .into_iter().map(sigmoid).collect();
        // n = act(x·W_n + (r ⊙ h)·U_n + b_n)
        let rh: Vec<f64> = r.iter().zip(h_prev.iter()).map(|(a, b)| a * b).collect();
        let a_n = affine(x, &self.w_n, &rh, &self.u_n, &self.b_n);
        let n = a_n.iter().map(|v| self.activator.function(*v)).collect();
        GruStep { x: x.to_vec(), h_prev: h_prev.to_vec(), z, r, n, a_n, rh }
    }

    fn run(&self, seq: &Matrix) -> (Matrix, Vec<GruStep>) {
        let mut h = vec![0.0; self.units];
        let mut steps = Vec::with_capacity(seq.rows);
        let mut outputs = Vec::with_capacity(seq.rows);
        for t in 0..seq.rows {
            let step = self.step(seq.row(t), &h);
            // h' = (1 - z) ⊙ n + z ⊙ h
            h = step.z.iter()
                .zip(step.n.iter())
                .zip(step.h_prev.iter())
                .map(|((z, n), hp)| (1.0 - z) * n + z * hp)
                .collect();
            outputs.push(h.clone());
            steps.push(step);
        }
        (Matrix { rows: seq.rows, cols: self.units, data: outputs }, steps)
    }

    /// All hidden states, shape `(timepoints, units)`.
    pub fn predict(&self, seq: &Matrix) -> Matrix {
        self.run(seq).0
    }

    pub fn forward(&mut self, seq: &Matrix) -> Matrix {
        let (out, steps) = self.run(seq);
        self.cache = Some(steps);
        out
    }

    /// Backpropagation through time. `grad` holds ∂L/∂h_t for every step
    /// (zero rows where a state is not consumed downstream).
    pub fn backward(&mut self, grad: &Matrix) -> Matrix {
        let steps = match self.cache.take() {
            Some(s) => s,
            None => return Matrix::zeros(grad.rows, self.input_size),
        };
        let mut grad_input = Matrix::zeros(steps.len(), self.input_size);
        let mut dh_next = vec![0.0; self.units];

        for (t, s) in steps.iter().enumerate().rev() {
            let dh: Vec<f64> = grad.row(t).iter().zip(dh_next.iter()).map(|(a, b)| a + b).collect();

            let mut dh_prev: Vec<f64> = dh.iter().zip(s.z.iter()).map(|(d, z)| d * z).collect();
            let da_n: Vec<f64> = (0..self.units)
                .map(|k| dh[k] * (1.0 - s.z[k]) * self.activator.derivative(s.a_n[k]))
                .collect();
            let da_z: Vec<f64> = (0..self.units)
                .map(|k| dh[k] * (s.h_prev[k] - s.n[k]) * s.z[k] * (1.0 - s.z[k]))
                .collect();

            let d_rh = self.u_n.value.right_mul_t(&da_n);
            let da_r: Vec<f64> = (0..self.units)
                .map(|k| d_rh[k] * s.h_prev[k] * s.r[k] * (1.0 - s.r[k]))
                .collect();
            for k in 0..self.units {
                dh_prev[k] += d_rh[k] * s.r[k];
            }

            self.w_n.grad.add_outer(&s.x, &da_n);
            self.u_n.grad.add_outer(&s.rh, &da_n);
            self.b_n.grad.add_to_row(0, &da_n);
            self.w_z.grad.add_outer(&s.x, &da_z);
            self.u_z.grad.add_outer(&s.h_prev, &da_z);
            self.b_z.grad.add_to_row(0, &da_z);
            self.w_r.grad.add_outer(&s.x, &da_r);
            self.u_r.grad.add_outer(&s.h_prev, &da_r);
            self.b_r.grad.add_to_row(0, &da_r);

            let from_z = self.u_z.value.right_mul_t(&da_z);
            let from_r = self.u_r.value.right_mul_t(&da_r);
            for k in 0..self.units {
                dh_prev[k] += from_z[k] + from_r[k];
            }

            let dx_z = self.w_z.value.right_mul_t(&da_z);
            let dx_r = self.w_r.value.right_mul_t(&da_r);
            let dx_n = self.w_n.value.right_mul_t(&da_n);
            grad_input.data[t] = (0..self.input_size)
                .map(|i| dx_z[i] + dx_r[i] + dx_n[i])
                .collect();

            dh_next = dh_prev;
        }
        grad_input
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![
            &mut self.w_z, &mut self.u_z, &mut self.b_z,
            &mut self.w_r, &mut self.u_r, &mut self.b_r,
            &mut self.w_n, &mut self.u_n, &mut self.b_n,
        ]
    }

    pub fn param_count(&self) -> usize {
        3 * (self.input_size * self.units + self.units * self.units + self.units)
    }

    pub fn params(&self) -> Vec<&Param> {
        vec![
            &self.w_z, &self.u_z, &self.b_z,
            &self.w_r, &self.u_r, &self.b_r,
            &self.w_n, &self.u_n, &self.b_n,
        ]
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }
}

/// Bidirectional GRU with concatenated outputs (`forward ‖ backward`).
///
/// With `return_sequences` the output is `(timepoints, 2 * units)`, the
/// backward states re-aligned to the original time order. Without it the
/// output is the `(1, 2 * units)` pair of final states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiGru {
    pub forward: Gru,
    pub backward: Gru,
    pub return_sequences: bool,
}

impl BiGru {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        units: usize,
        activation: ActivationFunction,
        return_sequences: bool,
        rng: &mut R,
    ) -> BiGru {
        BiGru {
            forward: Gru::new(input_size, units, activation.clone(), rng),
            backward: Gru::new(input_size, units, activation, rng),
            return_sequences,
        }
    }

    pub fn units(&self) -> usize {
        self.forward.units
    }

    pub fn output_size(&self) -> usize {
        2 * self.units()
    }

    fn merge(&self, fwd: &Matrix, bwd: &Matrix) -> Matrix {
        let t_len = fwd.rows;
        if t_len == 0 {
            return Matrix::zeros(0, self.output_size());
        }
        if self.return_sequences {
            let data = (0..t_len)
                .map(|t| {
                    let mut row = fwd.row(t).to_vec();
                    row.extend_from_slice(bwd.row(t_len - 1 - t));
                    row
                })
                .collect();
            Matrix { rows: t_len, cols: self.output_size(), data }
        } else {
            let mut row = fwd.row(t_len - 1).to_vec();
            row.extend_from_slice(bwd.row(t_len - 1));
            Matrix::from_row(row)
        }
    }

    pub fn predict(&self, seq: &Matrix) -> Matrix {
        let fwd = self.forward.predict(seq);
        let bwd = self.backward.predict(&seq.reversed_rows());
        self.merge(&fwd, &bwd)
    }

    pub fn forward(&mut self, seq: &Matrix) -> Matrix {
        let fwd = self.forward.forward(seq);
        let bwd = self.backward.forward(&seq.reversed_rows());
        self.merge(&fwd, &bwd)
    }

    /// `t_len` is the number of timepoints of the sequence last seen by
    /// `forward`.
    pub fn backward(&mut self, grad: &Matrix, t_len: usize) -> Matrix {
        let u = self.units();
        let mut g_fwd = Matrix::zeros(t_len, u);
        // indexed in processing order, i.e. reversed time
        let mut g_bwd = Matrix::zeros(t_len, u);
        if t_len > 0 {
            if self.return_sequences {
                for t in 0..t_len {
                    g_fwd.data[t] = grad.row(t)[..u].to_vec();
                    g_bwd.data[t_len - 1 - t] = grad.row(t)[u..].to_vec();
                }
            } else {
                g_fwd.data[t_len - 1] = grad.row(0)[..u].to_vec();
                g_bwd.data[t_len - 1] = grad.row(0)[u..].to_vec();
            }
        }
        let dx_fwd = self.forward.backward(&g_fwd);
        let dx_bwd = self.backward.backward(&g_bwd).reversed_rows();
        let mut dx = dx_fwd;
        for t in 0..dx.rows {
            dx.add_to_row(t, dx_bwd.row(t));
        }
        dx
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.forward.params_mut();
        params.extend(self.backward.params_mut());
        params
    }

    pub fn param_count(&self) -> usize {
        self.forward.param_count() + self.backward.param_count()
    }

    pub fn params(&self) -> Vec<&Param> {
        let mut params = self.forward.params();
        params.extend(self.backward.params());
        params
    }

    pub fn clear_cache(&mut self) {
        self.forward.clear_cache();
        self.backward.clear_cache();
    }

    pub fn has_cache(&self) -> bool {
        self.forward.has_cache() || self.backward.has_cache()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sequence() -> Matrix {
        Matrix::from_data(vec![
            vec![0.1, -0.3],
            vec![0.4, 0.2],
            vec![-0.5, 0.7],
            vec![0.0, 0.3],
        ])
    }

    #[test]
    fn output_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let seq_layer = BiGru::new(2, 3, ActivationFunction::Tanh, true, &mut rng);
        let last_layer = BiGru::new(2, 3, ActivationFunction::Tanh, false, &mut rng);
        assert_eq!(seq_layer.predict(&sequence()).shape(), (4, 6));
        assert_eq!(last_layer.predict(&sequence()).shape(), (1, 6));
    }

    #[test]
    fn last_state_output_matches_sequence_ends() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut layer = BiGru::new(2, 3, ActivationFunction::Tanh, true, &mut rng);
        let full = layer.predict(&sequence());
        layer.return_sequences = false;
        let last = layer.predict(&sequence());
        // forward half is the final timestep, backward half the first
        assert_eq!(&last.row(0)[..3], &full.row(3)[..3]);
        assert_eq!(&last.row(0)[3..], &full.row(0)[3..]);
    }

    #[test]
    fn bptt_input_gradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut layer = BiGru::new(2, 3, ActivationFunction::Tanh, true, &mut rng);
        let x = sequence();
        let loss = |l: &BiGru, input: &Matrix| -> f64 {
            l.predict(input).flatten().iter().map(|v| v * v).sum::<f64>() * 0.5
        };

        let out = layer.forward(&x);
        for p in layer.params_mut() {
            p.zero_grad();
        }
        // ∂(½‖y‖²)/∂y = y
        let dx = layer.backward(&out, x.rows);

        let eps = 1e-6;
        for (t, c) in [(0, 0), (2, 1), (3, 0)] {
            let mut plus = x.clone();
            plus.data[t][c] += eps;
            let mut minus = x.clone();
            minus.data[t][c] -= eps;
            let numeric = (loss(&layer, &plus) - loss(&layer, &minus)) / (2.0 * eps);
            assert!((dx.data[t][c] - numeric).abs() < 1e-5, "t={t} c={c}");
        }
    }

    #[test]
    fn bptt_weight_gradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut gru = Gru::new(2, 2, ActivationFunction::Tanh, &mut rng);
        let x = sequence();
        let loss = |g: &Gru| g.predict(&x).flatten().iter().sum::<f64>();

        let out = gru.forward(&x);
        for p in gru.params_mut() {
            p.zero_grad();
        }
        gru.backward(&Matrix::from_data(vec![vec![1.0; 2]; out.rows]));

        let eps = 1e-6;
        let analytic = gru.u_r.grad.data[0][1];
        let mut plus = gru.clone();
        plus.u_r.value.data[0][1] += eps;
        let mut minus = gru.clone();
        minus.u_r.value.data[0][1] -= eps;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        assert!((analytic - numeric).abs() < 1e-6);
    }
}
