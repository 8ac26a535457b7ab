//! End-to-end tests for the auto-encoder clusterer.

use std::path::{Path, PathBuf};

use ferrite_aebigru::{
    AeBiGruClusterer, AeBiGruConfig, AutoEncoder, Callback, DummyClusterer, Error, RandomState,
    TimeSeriesBatch, TrainingContext,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn synthetic(n_cases: usize, n_channels: usize, n_timepoints: usize) -> TimeSeriesBatch {
    let data = (0..n_cases)
        .flat_map(|case| {
            (0..n_channels).flat_map(move |ch| {
                (0..n_timepoints).map(move |t| {
                    let freq = if case % 2 == 0 { 0.25 } else { 0.9 };
                    (t as f64 * freq + ch as f64).sin() + 0.01 * case as f64
                })
            })
        })
        .collect();
    TimeSeriesBatch::new(n_cases, n_channels, n_timepoints, data).expect("valid batch")
}

fn scenario_config(dir: &Path) -> AeBiGruConfig {
    AeBiGruConfig {
        latent_space_dim: 4,
        n_layers: 1,
        n_units: Some(6.into()),
        n_epochs: 2,
        batch_size: 4,
        random_state: Some(1),
        file_path: format!("{}/", dir.display()),
        ..AeBiGruConfig::default()
    }
}

fn fitted(config: AeBiGruConfig) -> AeBiGruClusterer<DummyClusterer> {
    let mut clst = AeBiGruClusterer::with_estimator(config, DummyClusterer::new(2)).expect("valid config");
    clst.fit(&synthetic(8, 3, 20)).expect("fit should succeed");
    clst
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .expect("readable dir")
        .map(|e| e.expect("dir entry").path())
        .collect()
}

#[test]
fn test_end_to_end_with_dummy_clusterer() {
    let dir = TempDir::new().unwrap();
    let clst = fitted(scenario_config(dir.path()));
    let x = synthetic(8, 3, 20);

    let score = clst.score(&x).unwrap();
    assert!(score.is_finite());
    assert_eq!(clst.estimator().unwrap().n_clusters(), 2);
    assert_eq!(clst.predict(&x).unwrap().len(), 8);
    assert_eq!(clst.history().unwrap().len(), 2);
}

#[test]
fn test_encoder_output_is_one_code_per_case() {
    let dir = TempDir::new().unwrap();
    let clst = fitted(scenario_config(dir.path()));
    let z = clst.transform(&synthetic(8, 3, 20)).unwrap();
    assert_eq!(z.shape(), (8, 4));

    let model = clst.model().unwrap();
    assert_eq!(model.layers[1].name(), "encoder");
}

#[test]
fn test_temporal_latent_codes_keep_time_axis() {
    let dir = TempDir::new().unwrap();
    let config = AeBiGruConfig { temporal_latent_space: true, ..scenario_config(dir.path()) };
    let clst = fitted(config);
    let z = clst.transform(&synthetic(5, 3, 20)).unwrap();
    assert_eq!(z.shape(), (5, 20 * 4));
}

#[test]
fn test_inference_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let clst = fitted(scenario_config(dir.path()));
    let x = synthetic(8, 3, 20);

    assert_eq!(clst.transform(&x).unwrap(), clst.transform(&x).unwrap());
    assert_eq!(clst.score(&x).unwrap(), clst.score(&x).unwrap());
}

#[test]
fn test_same_seed_gives_same_latent_space() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let a = fitted(scenario_config(dir_a.path()));
    let b = fitted(scenario_config(dir_b.path()));
    let x = synthetic(8, 3, 20);
    assert_eq!(a.transform(&x).unwrap(), b.transform(&x).unwrap());
    assert_eq!(a.fitted().unwrap().random_state, Some(1));
}

#[test]
fn test_generator_random_state_draws_a_new_seed_per_fit() {
    let dir = TempDir::new().unwrap();
    let config = AeBiGruConfig { random_state: None, ..scenario_config(dir.path()) };
    let mut clst = AeBiGruClusterer::with_estimator(config, DummyClusterer::new(2))
        .unwrap()
        .with_random_state(RandomState::Generator(StdRng::seed_from_u64(9)));
    let x = synthetic(8, 3, 20);

    clst.fit(&x).unwrap();
    let first = clst.fitted().unwrap().random_state.unwrap();
    clst.fit(&x).unwrap();
    let second = clst.fitted().unwrap().random_state.unwrap();
    assert!(first < i32::MAX as u64);
    assert_ne!(first, second);
}

#[test]
fn test_checkpoint_is_removed_after_loading() {
    let dir = TempDir::new().unwrap();
    let clst = fitted(scenario_config(dir.path()));
    assert!(clst.fitted().unwrap().loaded_from_checkpoint);
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn test_save_best_model_keeps_a_reusable_checkpoint() {
    let dir = TempDir::new().unwrap();
    let config = AeBiGruConfig { save_best_model: true, ..scenario_config(dir.path()) };
    let clst = fitted(config);
    let best = dir.path().join("best_model.json");
    assert_eq!(files_in(dir.path()), vec![best.clone()]);
    assert_eq!(clst.fitted().unwrap().file_name.as_deref(), Some("best_model"));

    let mut restored = AeBiGruClusterer::with_estimator(AeBiGruConfig::default(), DummyClusterer::new(2)).unwrap();
    restored.load_pretrained(&best, clst.estimator().unwrap().clone()).unwrap();
    let x = synthetic(8, 3, 20);
    assert_eq!(restored.transform(&x).unwrap(), clst.transform(&x).unwrap());
    assert_eq!(restored.predict(&x).unwrap(), clst.predict(&x).unwrap());
}

/// Deletes the best-model file once training is over, so recovery finds
/// nothing on disk.
struct DiscardCheckpoint {
    path: PathBuf,
}

impl Callback for DiscardCheckpoint {
    fn name(&self) -> &str {
        "discard_checkpoint"
    }

    fn on_train_end(&mut self, _model: &AutoEncoder, _ctx: &mut TrainingContext) -> ferrite_aebigru::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[test]
fn test_missing_checkpoint_falls_back_to_training_model() {
    let dir = TempDir::new().unwrap();
    let config = AeBiGruConfig { save_best_model: true, ..scenario_config(dir.path()) };
    let discard = DiscardCheckpoint { path: dir.path().join("best_model.json") };
    let mut clst = AeBiGruClusterer::with_estimator(config, DummyClusterer::new(2))
        .unwrap()
        .with_callbacks(vec![Box::new(discard)]);
    let x = synthetic(8, 3, 20);
    clst.fit(&x).expect("a missing checkpoint is not an error");

    let state = clst.fitted().unwrap();
    assert!(!state.loaded_from_checkpoint);
    assert_eq!(state.model.summary(), state.training_model.summary());
    assert!(clst.score(&x).unwrap().is_finite());
}

#[test]
fn test_non_finite_data_leaves_estimator_unfitted() {
    let dir = TempDir::new().unwrap();
    let mut clst = AeBiGruClusterer::with_estimator(scenario_config(dir.path()), DummyClusterer::new(2)).unwrap();
    let good = synthetic(8, 3, 20);
    clst.fit(&good).unwrap();

    let mut values = good.as_slice().to_vec();
    values[5] = f64::NAN;
    let bad = TimeSeriesBatch::new(8, 3, 20, values).unwrap();
    let err = clst.fit(&bad).err().expect("NaN data must fail");
    assert!(matches!(err, Error::Training(_)));
    assert!(!clst.is_fitted());
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn test_shape_mismatch_after_fit() {
    let dir = TempDir::new().unwrap();
    let clst = fitted(scenario_config(dir.path()));
    assert!(matches!(clst.score(&synthetic(8, 2, 20)), Err(Error::ShapeMismatch { .. })));
    assert!(matches!(clst.transform(&synthetic(8, 3, 19)), Err(Error::ShapeMismatch { .. })));
}

#[test]
fn test_activation_list_must_match_layers() {
    let dir = TempDir::new().unwrap();
    let config = AeBiGruConfig {
        activation: vec!["tanh", "relu", "relu"].into(),
        n_layers: 2,
        ..scenario_config(dir.path())
    };
    let result = AeBiGruClusterer::with_estimator(config, DummyClusterer::new(2))
        .and_then(|mut c| c.fit(&synthetic(4, 1, 6)).map(|_| ()));
    assert!(matches!(result, Err(Error::Configuration(_))));
}
