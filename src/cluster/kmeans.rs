//! Lloyd's k-means with k-means++ seeding and random restarts.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::cluster::Clusterer;
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

/// Legacy k-means overrides; any field left `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    #[serde(default)]
    pub max_iter: Option<usize>,
    #[serde(default)]
    pub tol: Option<f64>,
    #[serde(default)]
    pub n_init: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters
    pub n_clusters: usize,
    /// Maximum Lloyd iterations per run
    pub max_iter: usize,
    /// Convergence tolerance on the inertia change
    pub tol: f64,
    /// Number of restarts; the run with the lowest inertia wins
    pub n_init: usize,
    /// Seed for centroid initialisation, entropy when `None`
    pub seed: Option<u64>,
    #[serde(default)]
    centroids: Option<Vec<Vec<f64>>>,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        KMeans {
            n_clusters,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            seed: None,
            centroids: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Applies the overrides present in `params`.
    pub fn with_params(mut self, params: &KMeansParams) -> Self {
        if let Some(max_iter) = params.max_iter {
            self.max_iter = max_iter;
        }
        if let Some(tol) = params.tol {
            self.tol = tol;
        }
        if let Some(n_init) = params.n_init {
            self.n_init = n_init;
        }
        self
    }

    /// Fitted centroids, one per cluster.
    pub fn centroids(&self) -> Option<&[Vec<f64>]> {
        self.centroids.as_deref()
    }

    fn fitted_centroids(&self) -> Result<&[Vec<f64>]> {
        self.centroids().ok_or(Error::NotFitted("predict"))
    }

    fn check_width(centroids: &[Vec<f64>], z: &Matrix) -> Result<()> {
        let width = centroids.first().map_or(0, |c| c.len());
        if z.cols != width {
            return Err(Error::ShapeMismatch { expected: vec![z.rows, width], got: vec![z.rows, z.cols] });
        }
        Ok(())
    }

    /// One Lloyd run from a k-means++ start. Returns centroids and inertia.
    fn run_once(&self, points: &[Vec<f64>], rng: &mut StdRng) -> (Vec<Vec<f64>>, f64) {
        let mut centroids = init_plus_plus(points, self.n_clusters, rng);
        let mut labels = vec![0usize; points.len()];
        let mut prev_inertia = f64::INFINITY;

        for iter in 0..self.max_iter {
            let mut inertia = 0.0;
            for (label, p) in labels.iter_mut().zip(points) {
                let (nearest, dist) = nearest_centroid(p, &centroids);
                *label = nearest;
                inertia += dist;
            }

            if (prev_inertia - inertia).abs() <= self.tol {
                debug!(iter, inertia, "k-means converged");
                break;
            }
            prev_inertia = inertia;
            update_centroids(points, &labels, &mut centroids);
        }

        let inertia = points.iter().map(|p| nearest_centroid(p, &centroids).1).sum();
        (centroids, inertia)
    }
}

impl Default for KMeans {
    fn default() -> Self {
        KMeans::new(2)
    }
}

impl Clusterer for KMeans {
    fn fit(&mut self, z: &Matrix) -> Result<()> {
        if z.rows == 0 {
            return Err(Error::EmptyData);
        }
        if self.n_clusters == 0 || self.n_clusters > z.rows {
            return Err(Error::config(format!(
                "n_clusters must be in 1..={} (got {})",
                z.rows, self.n_clusters
            )));
        }
        if self.n_init == 0 {
            return Err(Error::config("n_init must be at least 1"));
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut best: Option<(Vec<Vec<f64>>, f64)> = None;
        for _ in 0..self.n_init {
            let (centroids, inertia) = self.run_once(&z.data, &mut rng);
            if best.as_ref().map_or(true, |(_, b)| inertia < *b) {
                best = Some((centroids, inertia));
            }
        }

        if let Some((centroids, inertia)) = best {
            debug!(n_clusters = self.n_clusters, inertia, "k-means fitted");
            self.centroids = Some(centroids);
        }
        Ok(())
    }

    fn predict(&self, z: &Matrix) -> Result<Vec<usize>> {
        let centroids = self.fitted_centroids()?;
        KMeans::check_width(centroids, z)?;
        Ok(z.data.iter().map(|p| nearest_centroid(p, centroids).0).collect())
    }

    /// Negative inertia of `z` against the fitted centroids.
    fn score(&self, z: &Matrix) -> Result<f64> {
        let centroids = self.fitted_centroids()?;
        KMeans::check_width(centroids, z)?;
        Ok(-z.data.iter().map(|p| nearest_centroid(p, centroids).1).sum::<f64>())
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest_centroid(p: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids.iter()
        .map(|c| squared_distance(p, c))
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, d)| if d < best.1 { (i, d) } else { best })
}

fn init_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = points.iter().map(|p| nearest_centroid(p, &centroids).1).collect();
        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            // every point already coincides with a centroid
            Err(_) => rng.gen_range(0..points.len()),
        };
        centroids.push(points[next].clone());
    }
    centroids
}

/// Moves each centroid to the mean of its members; empty clusters keep
/// their previous position.
fn update_centroids(points: &[Vec<f64>], labels: &[usize], centroids: &mut [Vec<f64>]) {
    let dim = centroids.first().map_or(0, |c| c.len());
    let mut sums = vec![vec![0.0; dim]; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];
    for (p, &label) in points.iter().zip(labels) {
        counts[label] += 1;
        for (s, v) in sums[label].iter_mut().zip(p) {
            *s += v;
        }
    }
    for ((c, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
        if count > 0 {
            *c = sum.into_iter().map(|s| s / count as f64).collect();
        }
    }
}
