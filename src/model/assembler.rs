use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::error::Result;
use crate::loss::loss_type::LossType;
use crate::model::autoencoder::AutoEncoder;
use crate::model::compile::{resolve_metrics, CompileConfig, MetricsSpec};
use crate::network::builder::AeBiGruNetwork;
use crate::optim::optimizer::OptimizerSpec;

/// Compile-time choices for an assembled model.
#[derive(Debug, Clone, Default)]
pub struct CompileSettings<'a> {
    pub loss: &'a str,
    pub metrics: Option<&'a MetricsSpec>,
    pub optimizer: Option<&'a OptimizerSpec>,
}

/// Builds and compiles an untrained auto-encoder for `input_shape`
/// (`(n_timepoints, n_channels)`).
///
/// Weights are drawn from an RNG seeded with `seed` alone, so the same seed
/// always gives the same initial model. Loss, metrics and optimizer are
/// validated before any layer is built.
pub fn assemble(
    network: &AeBiGruNetwork,
    input_shape: (usize, usize),
    settings: &CompileSettings<'_>,
    seed: u64,
) -> Result<AutoEncoder> {
    let optimizer = OptimizerSpec::resolve(settings.optimizer)?;
    let metrics = resolve_metrics(settings.metrics)?;
    let loss: LossType = settings.loss.parse()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let (encoder, decoder) = network.build_network(input_shape, &mut rng)?;

    let mut model = AutoEncoder::new(input_shape, encoder, decoder);
    model.compile(CompileConfig { optimizer, loss, metrics });
    debug!(
        input_shape = ?input_shape,
        params = model.param_count(),
        seed,
        "assembled auto-encoder"
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::network::config::NetworkConfig;
    use crate::optim::optimizer::OptimizerConfig;
    use proptest::prelude::*;
    use serde_json::json;

    fn network(latent: usize, temporal: bool) -> AeBiGruNetwork {
        AeBiGruNetwork::new(NetworkConfig {
            latent_space_dim: latent,
            temporal_latent_space: temporal,
            n_layers: 1,
            n_units: Some(2.into()),
            ..NetworkConfig::default()
        })
    }

    fn settings(metrics: Option<&MetricsSpec>) -> CompileSettings<'_> {
        CompileSettings { loss: "mse", metrics, optimizer: None }
    }

    #[test]
    fn compiled_metrics_follow_resolution_rules() {
        let cases: Vec<(Option<MetricsSpec>, Vec<&str>)> = vec![
            (None, vec!["mean_squared_error"]),
            (Some("mse".into()), vec!["mse"]),
            (Some(vec!["mse", "mae"].into()), vec!["mse", "mae"]),
        ];
        for (spec, expected) in cases {
            let model = assemble(&network(2, false), (5, 2), &settings(spec.as_ref()), 0).unwrap();
            assert_eq!(model.compile_config().unwrap().metrics, expected);
        }
    }

    #[test]
    fn integer_metrics_fail_before_building() {
        let spec = MetricsSpec::from(json!(5));
        let err = assemble(&network(2, false), (5, 2), &settings(Some(&spec)), 0).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn default_optimizer_is_adam() {
        let model = assemble(&network(2, false), (5, 2), &settings(None), 0).unwrap();
        assert_eq!(model.compile_config().unwrap().optimizer, OptimizerConfig::default());
    }

    #[test]
    fn unknown_loss_is_rejected() {
        let s = CompileSettings { loss: "cosine", metrics: None, optimizer: None };
        assert!(matches!(assemble(&network(2, false), (5, 2), &s, 0), Err(Error::Configuration(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn output_shape_round_trips(
            timepoints in 1usize..12,
            channels in 1usize..5,
            latent in 1usize..4,
            temporal in any::<bool>(),
        ) {
            let model = assemble(&network(latent, temporal), (timepoints, channels), &settings(None), 3).unwrap();
            prop_assert_eq!(model.output_shape().unwrap(), (timepoints, channels));
            let out = model.predict(&crate::math::matrix::Matrix::zeros(timepoints, channels)).unwrap();
            prop_assert_eq!(out.shape(), (timepoints, channels));
        }
    }
}
