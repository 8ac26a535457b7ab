use serde::{Serialize, Deserialize};
use std::str::FromStr;

use crate::error::Error;

const HUBER_DELTA: f64 = 1.0;

/// Selects the reconstruction loss (and, by name, the metrics) of a
/// compiled model.
///
/// - `Mse`   — mean-squared error (`"mse"`, `"mean_squared_error"`)
/// - `Mae`   — mean absolute error (`"mae"`, `"mean_absolute_error"`)
/// - `Huber` — Huber loss with δ=1.0 (`"huber"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossType {
    Mse,
    Mae,
    Huber,
}

impl LossType {
    /// Loss of a single residual `x = predicted - expected`.
    fn pointwise(self, x: f64) -> f64 {
        match self {
            LossType::Mse => x * x,
            LossType::Mae => x.abs(),
            LossType::Huber if x.abs() <= HUBER_DELTA => 0.5 * x * x,
            LossType::Huber => HUBER_DELTA * (x.abs() - 0.5 * HUBER_DELTA),
        }
    }

    /// d/dx of `pointwise`; the MAE subgradient is 0 at x = 0.
    fn pointwise_derivative(self, x: f64) -> f64 {
        match self {
            LossType::Mse => 2.0 * x,
            LossType::Mae if x == 0.0 => 0.0,
            LossType::Mae => x.signum(),
            LossType::Huber if x.abs() <= HUBER_DELTA => x,
            LossType::Huber => HUBER_DELTA * x.signum(),
        }
    }

    /// Mean loss over all outputs of one sample.
    pub fn loss(self, predicted: &[f64], expected: &[f64]) -> f64 {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected)
            .map(|(p, y)| self.pointwise(p - y))
            .sum::<f64>() / n
    }

    /// ∂loss/∂predicted for one sample.
    pub fn derivative(self, predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        let n = predicted.len() as f64;
        predicted.iter().zip(expected)
            .map(|(p, y)| self.pointwise_derivative(p - y) / n)
            .collect()
    }
}

impl FromStr for LossType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mse" | "mean_squared_error" => Ok(LossType::Mse),
            "mae" | "mean_absolute_error" => Ok(LossType::Mae),
            "huber" | "huber_loss" => Ok(LossType::Huber),
            other => Err(Error::config(format!("unknown loss or metric '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_names() {
        assert_eq!("mse".parse::<LossType>().unwrap(), LossType::Mse);
        assert_eq!("mean_squared_error".parse::<LossType>().unwrap(), LossType::Mse);
        assert_eq!("mean_absolute_error".parse::<LossType>().unwrap(), LossType::Mae);
        assert!("hinge".parse::<LossType>().is_err());
    }

    #[test]
    fn gradients_match_finite_difference() {
        let p = [0.2, -1.7, 3.0];
        let y = [0.0, 0.5, 1.0];
        let eps = 1e-6;
        for loss in [LossType::Mse, LossType::Huber] {
            let grad = loss.derivative(&p, &y);
            for i in 0..p.len() {
                let mut plus = p;
                plus[i] += eps;
                let mut minus = p;
                minus[i] -= eps;
                let numeric = (loss.loss(&plus, &y) - loss.loss(&minus, &y)) / (2.0 * eps);
                assert!((grad[i] - numeric).abs() < 1e-6, "{loss:?} index {i}");
            }
        }
    }

    #[test]
    fn known_values() {
        let p = [1.0, 3.0];
        let y = [0.0, 0.0];
        assert_eq!(LossType::Mse.loss(&p, &y), 5.0);
        assert_eq!(LossType::Mae.loss(&p, &y), 2.0);
        // 0.5·1² and 1·(3 − 0.5)
        assert_eq!(LossType::Huber.loss(&p, &y), 1.5);
        assert_eq!(LossType::Mae.derivative(&[0.0, -2.0], &[0.0, 0.0]), vec![0.0, -0.5]);
    }
}
