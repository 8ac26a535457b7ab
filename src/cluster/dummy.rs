//! Baseline clusterer that ignores the data when assigning labels.

use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::cluster::{within_cluster_sse, Clusterer};
use crate::error::{Error, Result};
use crate::math::matrix::Matrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DummyStrategy {
    /// Round robin: row `i` goes to cluster `i % n_clusters`.
    #[default]
    Uniform,
    /// Uniformly random labels, reproducible for a fitted instance.
    Random,
    /// Everything in cluster 0.
    SingleCluster,
}

impl FromStr for DummyStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "uniform" => Ok(DummyStrategy::Uniform),
            "random" => Ok(DummyStrategy::Random),
            "single_cluster" => Ok(DummyStrategy::SingleCluster),
            other => Err(Error::config(format!("unknown dummy strategy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DummyClusterer {
    n_clusters: usize,
    pub strategy: DummyStrategy,
    pub seed: Option<u64>,
    #[serde(default)]
    fitted_seed: Option<u64>,
    #[serde(default)]
    labels: Vec<usize>,
}

impl DummyClusterer {
    pub fn new(n_clusters: usize) -> Self {
        DummyClusterer {
            n_clusters,
            strategy: DummyStrategy::default(),
            seed: None,
            fitted_seed: None,
            labels: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: DummyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Labels assigned to the data seen by `fit`.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    fn assign(&self, n_rows: usize, seed: u64) -> Vec<usize> {
        match self.strategy {
            DummyStrategy::Uniform => (0..n_rows).map(|i| i % self.n_clusters).collect(),
            DummyStrategy::SingleCluster => vec![0; n_rows],
            DummyStrategy::Random => {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..n_rows).map(|_| rng.gen_range(0..self.n_clusters)).collect()
            }
        }
    }
}

impl Clusterer for DummyClusterer {
    fn fit(&mut self, z: &Matrix) -> Result<()> {
        if z.rows == 0 {
            return Err(Error::EmptyData);
        }
        if self.n_clusters == 0 {
            return Err(Error::config("n_clusters must be at least 1"));
        }
        let seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());
        self.fitted_seed = Some(seed);
        self.labels = self.assign(z.rows, seed);
        Ok(())
    }

    fn predict(&self, z: &Matrix) -> Result<Vec<usize>> {
        let seed = self.fitted_seed.ok_or(Error::NotFitted("predict"))?;
        Ok(self.assign(z.rows, seed))
    }

    /// Negative within-cluster sum of squares of the predicted labelling.
    fn score(&self, z: &Matrix) -> Result<f64> {
        let labels = self.predict(z)?;
        Ok(-within_cluster_sse(z, &labels, self.n_clusters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn z(n: usize) -> Matrix {
        Matrix::from_data((0..n).map(|i| vec![i as f64, 1.0]).collect())
    }

    #[test]
    fn uniform_is_round_robin() {
        let mut d = DummyClusterer::new(3);
        d.fit(&z(7)).unwrap();
        assert_eq!(d.labels(), &[0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(d.n_clusters(), 3);
    }

    #[test]
    fn single_cluster_score_is_total_variance() {
        let mut d = DummyClusterer::new(2).with_strategy(DummyStrategy::SingleCluster);
        d.fit(&z(3)).unwrap();
        // column 0 = [0, 1, 2], mean 1 → SSE 2; column 1 is constant
        assert_eq!(d.score(&z(3)).unwrap(), -2.0);
    }

    #[test]
    fn random_labels_are_stable_after_fit() {
        let mut d = DummyClusterer::new(4).with_strategy(DummyStrategy::Random);
        d.fit(&z(20)).unwrap();
        let first = d.predict(&z(20)).unwrap();
        assert_eq!(first, d.predict(&z(20)).unwrap());
        assert_eq!(first, d.labels());
        assert!(first.iter().all(|&l| l < 4));
    }

    #[test]
    fn strategy_parses_from_str() {
        assert_eq!("single_cluster".parse::<DummyStrategy>().unwrap(), DummyStrategy::SingleCluster);
        assert!("kmeans".parse::<DummyStrategy>().is_err());
    }

    #[test]
    fn predict_before_fit_fails() {
        assert!(matches!(DummyClusterer::new(2).predict(&z(2)), Err(Error::NotFitted(_))));
    }
}
