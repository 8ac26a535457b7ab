use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Repeats a `(1, n)` vector `times` times, giving `(times, n)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatVector {
    pub times: usize,
}

impl RepeatVector {
    pub fn new(times: usize) -> RepeatVector {
        RepeatVector { times }
    }

    pub fn predict(&self, input: &Matrix) -> Matrix {
        let row = input.data.first().cloned().unwrap_or_default();
        Matrix { rows: self.times, cols: row.len(), data: vec![row; self.times] }
    }

    /// Gradients of the copies are summed back onto the source vector.
    pub fn backward(&self, grad: &Matrix) -> Matrix {
        let mut summed = Matrix::zeros(1, grad.cols);
        for t in 0..grad.rows {
            summed.add_to_row(0, grad.row(t));
        }
        summed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_and_sums_back() {
        let rv = RepeatVector::new(3);
        let out = rv.predict(&Matrix::from_row(vec![1.0, 2.0]));
        assert_eq!(out.shape(), (3, 2));
        let grad = rv.backward(&Matrix::from_data(vec![vec![1.0, 0.5]; 3]));
        assert_eq!(grad.data, vec![vec![3.0, 1.5]]);
    }
}
