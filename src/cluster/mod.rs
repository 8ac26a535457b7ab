//! Clustering algorithms applied to latent codes.

pub mod dummy;
pub mod kmeans;

pub use dummy::{DummyClusterer, DummyStrategy};
pub use kmeans::{KMeans, KMeansParams};

use crate::error::Result;
use crate::math::matrix::Matrix;

/// A clustering algorithm over row vectors (one row per case).
///
/// Implementations are cloned before each fit so an unfitted template can be
/// reused across several fits.
pub trait Clusterer {
    /// Learns clusters from `z`.
    fn fit(&mut self, z: &Matrix) -> Result<()>;

    /// Assigns each row of `z` to a cluster.
    fn predict(&self, z: &Matrix) -> Result<Vec<usize>>;

    /// Goodness of the clustering of `z`; higher is better.
    fn score(&self, z: &Matrix) -> Result<f64>;
}

/// Sum of squared distances of each row to the mean of its cluster.
pub(crate) fn within_cluster_sse(z: &Matrix, labels: &[usize], n_clusters: usize) -> f64 {
    let mut sums = vec![vec![0.0; z.cols]; n_clusters];
    let mut counts = vec![0usize; n_clusters];
    for (row, &label) in z.data.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(row) {
            *s += v;
        }
    }
    z.data.iter()
        .zip(labels)
        .map(|(row, &label)| {
            let n = counts[label] as f64;
            row.iter()
                .zip(&sums[label])
                .map(|(v, s)| (v - s / n).powi(2))
                .sum::<f64>()
        })
        .sum()
}
