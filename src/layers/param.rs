use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// A trainable tensor together with its accumulated gradient.
///
/// Only `value` is serialized; `grad` is rebuilt by `zero_grad()` before
/// every mini-batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub value: Matrix,
    #[serde(skip)]
    pub grad: Matrix,
}

impl Param {
    pub fn new(value: Matrix) -> Param {
        let grad = Matrix::zeros(value.rows, value.cols);
        Param { value, grad }
    }

    pub fn zeros(rows: usize, cols: usize) -> Param {
        Param::new(Matrix::zeros(rows, cols))
    }

    pub fn zero_grad(&mut self) {
        if self.grad.shape() == self.value.shape() {
            for g in self.grad.data.iter_mut().flatten() {
                *g = 0.0;
            }
        } else {
            self.grad = Matrix::zeros(self.value.rows, self.value.cols);
        }
    }

    pub fn count(&self) -> usize {
        self.value.len()
    }
}
