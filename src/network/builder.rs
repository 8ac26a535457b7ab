use rand::Rng;

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::{BiGru, Dense, Layer, RepeatVector};
use crate::network::config::NetworkConfig;
use crate::network::network::Network;

/// Builds the encoder and decoder halves of the bidirectional GRU
/// auto-encoder.
///
/// Encoder: `n_layers` bidirectional GRUs, then a linear dense projection to
/// `latent_space_dim`. The last GRU keeps the time axis only for a temporal
/// latent space. Decoder: mirror image, starting with a `RepeatVector` when
/// the latent codes are flat, and ending in a linear dense layer back to
/// `n_channels`.
#[derive(Debug, Clone)]
pub struct AeBiGruNetwork {
    config: NetworkConfig,
}

impl AeBiGruNetwork {
    pub fn new(config: NetworkConfig) -> AeBiGruNetwork {
        AeBiGruNetwork { config }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// `input_shape` is `(n_timepoints, n_channels)`.
    pub fn build_network<R: Rng + ?Sized>(
        &self,
        input_shape: (usize, usize),
        rng: &mut R,
    ) -> Result<(Network, Network)> {
        self.config.validate()?;
        let (n_timepoints, n_channels) = input_shape;
        if n_timepoints == 0 || n_channels == 0 {
            return Err(Error::config(format!(
                "input shape must be positive, got {input_shape:?}"
            )));
        }
        let units = self.config.resolve_units()?;
        let activations = self.config.activation.resolve(self.config.n_layers)?;
        let n = self.config.n_layers;
        let latent = self.config.latent_space_dim;
        let temporal = self.config.temporal_latent_space;

        let mut encoder_layers = Vec::with_capacity(n + 1);
        let mut width = n_channels;
        for i in 0..n {
            let return_sequences = temporal || i + 1 < n;
            let layer = BiGru::new(width, units[i], activations[i].clone(), return_sequences, rng);
            width = layer.output_size();
            encoder_layers.push(Layer::BiGru(layer));
        }
        encoder_layers.push(Layer::Dense(Dense::new(width, latent, ActivationFunction::Identity, rng)));

        let mut decoder_layers = Vec::with_capacity(n + 2);
        if !temporal {
            decoder_layers.push(Layer::RepeatVector(RepeatVector::new(n_timepoints)));
        }
        let mut width = latent;
        for i in (0..n).rev() {
            let layer = BiGru::new(width, units[i], activations[i].clone(), true, rng);
            width = layer.output_size();
            decoder_layers.push(Layer::BiGru(layer));
        }
        decoder_layers.push(Layer::Dense(Dense::new(width, n_channels, ActivationFunction::Identity, rng)));

        Ok((
            Network::new("encoder", encoder_layers),
            Network::new("decoder", decoder_layers),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::config::UnitsSpec;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small(temporal: bool) -> NetworkConfig {
        NetworkConfig {
            latent_space_dim: 4,
            temporal_latent_space: temporal,
            n_layers: 2,
            n_units: Some(UnitsSpec::PerLayer(vec![3, 2])),
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn flat_latent_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let (enc, dec) = AeBiGruNetwork::new(small(false)).build_network((10, 3), &mut rng).unwrap();
        assert_eq!(enc.output_shape((10, 3)), (1, 4));
        assert_eq!(dec.output_shape((1, 4)), (10, 3));
        assert!(matches!(dec.layers[0], Layer::RepeatVector(_)));
    }

    #[test]
    fn temporal_latent_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let (enc, dec) = AeBiGruNetwork::new(small(true)).build_network((10, 3), &mut rng).unwrap();
        assert_eq!(enc.output_shape((10, 3)), (10, 4));
        assert_eq!(dec.output_shape((10, 4)), (10, 3));
    }

    #[test]
    fn activation_count_mismatch_fails_at_build() {
        let cfg = NetworkConfig { activation: vec!["relu"].into(), ..small(false) };
        let mut rng = StdRng::seed_from_u64(0);
        let err = AeBiGruNetwork::new(cfg).build_network((10, 3), &mut rng).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn same_seed_same_weights() {
        let net = AeBiGruNetwork::new(small(false));
        let (a, _) = net.build_network((5, 2), &mut StdRng::seed_from_u64(9)).unwrap();
        let (b, _) = net.build_network((5, 2), &mut StdRng::seed_from_u64(9)).unwrap();
        let x = crate::math::matrix::Matrix::from_data(vec![vec![0.5, -0.5]; 5]);
        assert_eq!(a.predict(&x), b.predict(&x));
    }
}
