use crate::layers::param::Param;
use crate::math::matrix::Matrix;

/// Adam optimizer with bias-corrected moment estimates.
///
/// Moment buffers are indexed by parameter position, so `step` must always
/// be called with the parameters in the same order.
pub struct Adam {
    pub learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: u64,
    m: Vec<Matrix>,
    v: Vec<Matrix>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Adam {
        Adam { learning_rate, beta1, beta2, epsilon, t: 0, m: Vec::new(), v: Vec::new() }
    }

    fn ensure_moments(&mut self, params: &[&mut Param]) {
        if self.m.len() != params.len() {
            self.m = params.iter().map(|p| Matrix::zeros(p.value.rows, p.value.cols)).collect();
            self.v = self.m.clone();
        }
    }

    pub fn step(&mut self, params: &mut [&mut Param]) {
        self.ensure_moments(params);
        self.t += 1;

        // Bias correction folded into the step size
        let t = self.t as i32;
        let lr_t = self.learning_rate
            * ((1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t)));

        for (i, param) in params.iter_mut().enumerate() {
            let Param { value, grad } = &mut **param;
            let m = self.m[i].data.iter_mut().flatten();
            let v = self.v[i].data.iter_mut().flatten();
            let w = value.data.iter_mut().flatten();
            let g = grad.data.iter().flatten();
            for (((w, g), m), v) in w.zip(g).zip(m).zip(v) {
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
                *w -= lr_t * *m / (v.sqrt() + self.epsilon);
            }
        }
    }
}
