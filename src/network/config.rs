use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationSpec;
use crate::error::{Error, Result};

/// Unit width of the recurrent layers: one width for every layer, or one
/// per layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitsSpec {
    Single(usize),
    PerLayer(Vec<usize>),
}

impl From<usize> for UnitsSpec {
    fn from(units: usize) -> Self {
        UnitsSpec::Single(units)
    }
}

impl From<Vec<usize>> for UnitsSpec {
    fn from(units: Vec<usize>) -> Self {
        UnitsSpec::PerLayer(units)
    }
}

/// Architecture of the bidirectional GRU auto-encoder.
///
/// - `latent_space_dim`      — width of the bottleneck
/// - `temporal_latent_space` — keep a time axis in the latent codes
///                             (`(timepoints, latent_space_dim)` per case)
///                             instead of a flat vector
/// - `n_layers`              — recurrent layers in the encoder, mirrored in
///                             the decoder
/// - `n_units`               — units per direction; `None` alternates 50 / 100
/// - `activation`            — candidate-state activation of each layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub latent_space_dim: usize,
    pub temporal_latent_space: bool,
    pub n_layers: usize,
    #[serde(default)]
    pub n_units: Option<UnitsSpec>,
    #[serde(default)]
    pub activation: ActivationSpec,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            latent_space_dim: 128,
            temporal_latent_space: false,
            n_layers: 2,
            n_units: None,
            activation: ActivationSpec::default(),
        }
    }
}

impl NetworkConfig {
    /// Per-layer unit widths, length `n_layers`.
    pub fn resolve_units(&self) -> Result<Vec<usize>> {
        let units = match &self.n_units {
            None => (0..self.n_layers).map(|i| if i % 2 == 0 { 50 } else { 100 }).collect(),
            Some(UnitsSpec::Single(n)) => vec![*n; self.n_layers],
            Some(UnitsSpec::PerLayer(v)) => {
                if v.len() != self.n_layers {
                    return Err(Error::config(format!(
                        "number of unit widths {} should be the same as number of layers {}",
                        v.len(),
                        self.n_layers
                    )));
                }
                v.clone()
            }
        };
        if units.iter().any(|&u| u == 0) {
            return Err(Error::config("unit widths must be positive"));
        }
        Ok(units)
    }

    pub fn validate(&self) -> Result<()> {
        if self.latent_space_dim == 0 {
            return Err(Error::config("latent_space_dim must be positive"));
        }
        if self.n_layers == 0 {
            return Err(Error::config("n_layers must be positive"));
        }
        Ok(())
    }
}
