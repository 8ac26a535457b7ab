use rand::Rng;
use serde::{Serialize, Deserialize};

/// Dense row-major matrix.
///
/// A single time series sample is stored as `(n_timepoints, n_channels)`;
/// flat vectors are `(1, n)` matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Glorot (Xavier) uniform initialization: samples from
    /// U(-l, l) with l = sqrt(6 / (rows + cols)).
    ///
    /// Shape: (rows, cols). `rows` is the fan-in, `cols` the fan-out.
    pub fn glorot_uniform<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let limit = (6.0 / (rows + cols).max(1) as f64).sqrt();
        let mut res = Matrix::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = rng.gen_range(-limit..=limit);
            }
        }
        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        Matrix {
            rows: data.len(),
            cols: data.first().map_or(0, |row| row.len()),
            data
        }
    }

    /// Wraps a single vector as a `(1, n)` matrix.
    pub fn from_row(row: Vec<f64>) -> Matrix {
        Matrix::from_data(vec![row])
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i]
    }

    /// Row-major copy of every element.
    pub fn flatten(&self) -> Vec<f64> {
        self.data.iter().flatten().copied().collect()
    }

    /// Rebuilds the matrix with a new shape holding the same elements in
    /// row-major order. Returns `None` when the element counts differ.
    pub fn reshape(&self, rows: usize, cols: usize) -> Option<Matrix> {
        if rows * cols != self.len() {
            return None;
        }
        let flat = self.flatten();
        let data = if cols == 0 {
            vec![Vec::new(); rows]
        } else {
            flat.chunks(cols).map(|c| c.to_vec()).collect()
        };
        Some(Matrix { rows, cols, data })
    }

    /// Rows in reverse order; used to run the backward direction of a
    /// bidirectional recurrent layer.
    pub fn reversed_rows(&self) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().rev().cloned().collect(),
        }
    }

    /// Row vector `x` (length `rows`) times this matrix, giving length `cols`.
    pub fn left_mul(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.rows);
        let mut out = vec![0.0; self.cols];
        for (xi, row) in x.iter().zip(self.data.iter()) {
            if *xi == 0.0 {
                continue;
            }
            for (o, w) in out.iter_mut().zip(row.iter()) {
                *o += xi * w;
            }
        }
        out
    }

    /// Row vector `d` (length `cols`) times the transpose of this matrix,
    /// giving length `rows`.
    pub fn right_mul_t(&self, d: &[f64]) -> Vec<f64> {
        debug_assert_eq!(d.len(), self.cols);
        self.data.iter()
            .map(|row| row.iter().zip(d.iter()).map(|(w, g)| w * g).sum())
            .collect()
    }

    /// Accumulates the outer product `aᵀ·b` into this matrix.
    pub fn add_outer(&mut self, a: &[f64], b: &[f64]) {
        debug_assert_eq!(a.len(), self.rows);
        debug_assert_eq!(b.len(), self.cols);
        for (ai, row) in a.iter().zip(self.data.iter_mut()) {
            if *ai == 0.0 {
                continue;
            }
            for (r, bj) in row.iter_mut().zip(b.iter()) {
                *r += ai * bj;
            }
        }
    }

    /// Adds `v` element-wise into row `i`.
    pub fn add_to_row(&mut self, i: usize, v: &[f64]) {
        for (r, x) in self.data[i].iter_mut().zip(v.iter()) {
            *r += x;
        }
    }

    pub fn scale_in_place(&mut self, factor: f64) {
        for x in self.data.iter_mut().flatten() {
            *x *= factor;
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn left_and_right_products() {
        let w = Matrix::from_data(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(w.left_mul(&[1.0, 1.0]), vec![5.0, 7.0, 9.0]);
        assert_eq!(w.right_mul_t(&[1.0, 0.0, 1.0]), vec![4.0, 10.0]);
    }

    #[test]
    fn reshape_keeps_row_major_order() {
        let m = Matrix::from_data(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        let r = m.reshape(3, 2).unwrap();
        assert_eq!(r.data, vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        assert!(m.reshape(4, 2).is_none());
    }

    #[test]
    fn glorot_is_bounded_and_seeded() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let m = Matrix::glorot_uniform(4, 2, &mut a);
        let limit = (6.0_f64 / 6.0).sqrt();
        assert!(m.data.iter().flatten().all(|x| x.abs() <= limit));
        assert_eq!(m, Matrix::glorot_uniform(4, 2, &mut b));
    }

    #[test]
    fn add_outer_accumulates() {
        let mut m = Matrix::zeros(2, 2);
        m.add_outer(&[1.0, 2.0], &[3.0, 4.0]);
        m.add_outer(&[1.0, 0.0], &[1.0, 1.0]);
        assert_eq!(m.data, vec![vec![4.0, 5.0], vec![6.0, 8.0]]);
    }
}
