use serde::{Serialize, Deserialize};
use std::f64::consts::{E, PI};
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    Identity,
    Tanh,
    LeakyReLU { alpha: f64 },
    Elu { alpha: f64 },
    Gelu,
    Swish,
}

impl ActivationFunction {
    /// Element-wise activation.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * (E.powf(x) - 1.0) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x / (1.0 + E.powf(-x)),
        }
    }

    /// Element-wise derivative, evaluated at the pre-activation value.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = self.function(x);
                fx * (1.0 - fx)
            },
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { 1.0 } else { alpha * E.powf(x) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let tanh_inner = inner.tanh();
                let sech2 = 1.0 - tanh_inner * tanh_inner;
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * tanh_inner + 0.5 * x * sech2 * d_inner + 0.5
            }
            ActivationFunction::Swish => {
                let sig = 1.0 / (1.0 + E.powf(-x));
                sig + x * sig * (1.0 - sig)
            }
        }
    }

    /// Short identifier, the inverse of `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            ActivationFunction::Sigmoid => "sigmoid",
            ActivationFunction::ReLU => "relu",
            ActivationFunction::Identity => "linear",
            ActivationFunction::Tanh => "tanh",
            ActivationFunction::LeakyReLU { .. } => "leaky_relu",
            ActivationFunction::Elu { .. } => "elu",
            ActivationFunction::Gelu => "gelu",
            ActivationFunction::Swish => "swish",
        }
    }
}

impl FromStr for ActivationFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sigmoid" => Ok(ActivationFunction::Sigmoid),
            "relu" => Ok(ActivationFunction::ReLU),
            "linear" | "identity" => Ok(ActivationFunction::Identity),
            "tanh" => Ok(ActivationFunction::Tanh),
            "leaky_relu" => Ok(ActivationFunction::LeakyReLU { alpha: 0.3 }),
            "elu" => Ok(ActivationFunction::Elu { alpha: 1.0 }),
            "gelu" => Ok(ActivationFunction::Gelu),
            "swish" | "silu" => Ok(ActivationFunction::Swish),
            other => Err(Error::config(format!("unknown activation '{other}'"))),
        }
    }
}

/// Activation setting for a stack of recurrent layers: one identifier
/// broadcast to every layer, or one identifier per layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivationSpec {
    Single(String),
    PerLayer(Vec<String>),
}

impl ActivationSpec {
    /// Expands the setting to exactly `n_layers` activations.
    pub fn resolve(&self, n_layers: usize) -> Result<Vec<ActivationFunction>, Error> {
        match self {
            ActivationSpec::Single(name) => {
                let activation: ActivationFunction = name.parse()?;
                Ok(vec![activation; n_layers])
            }
            ActivationSpec::PerLayer(names) => {
                if names.len() != n_layers {
                    return Err(Error::config(format!(
                        "number of activations {} should be the same as number of layers {}",
                        names.len(),
                        n_layers
                    )));
                }
                names.iter().map(|n| n.parse()).collect()
            }
        }
    }
}

impl Default for ActivationSpec {
    fn default() -> Self {
        ActivationSpec::Single("relu".to_string())
    }
}

impl From<&str> for ActivationSpec {
    fn from(name: &str) -> Self {
        ActivationSpec::Single(name.to_string())
    }
}

impl From<Vec<&str>> for ActivationSpec {
    fn from(names: Vec<&str>) -> Self {
        ActivationSpec::PerLayer(names.into_iter().map(String::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_activation_is_broadcast() {
        let acts = ActivationSpec::from("tanh").resolve(3).unwrap();
        assert_eq!(acts, vec![ActivationFunction::Tanh; 3]);
    }

    #[test]
    fn per_layer_length_must_match() {
        let spec = ActivationSpec::from(vec!["relu", "tanh"]);
        assert!(spec.resolve(2).is_ok());
        assert!(matches!(spec.resolve(3), Err(Error::Configuration(_))));
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        assert!("softsign".parse::<ActivationFunction>().is_err());
        assert_eq!("ReLU".parse::<ActivationFunction>().unwrap(), ActivationFunction::ReLU);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let eps = 1e-6;
        for act in [ActivationFunction::Sigmoid, ActivationFunction::Tanh, ActivationFunction::Gelu] {
            let x = 0.3;
            let numeric = (act.function(x + eps) - act.function(x - eps)) / (2.0 * eps);
            assert!((numeric - act.derivative(x)).abs() < 1e-5, "{}", act.name());
        }
    }
}
