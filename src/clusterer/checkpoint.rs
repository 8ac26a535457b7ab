//! Checkpoint file naming and post-training recovery.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::error::Result;
use crate::model::autoencoder::AutoEncoder;

pub const CHECKPOINT_EXTENSION: &str = ".json";

static TOKEN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `file_path + file_name + ".json"`, joined as plain strings so a
/// `file_path` without a trailing separator acts as a name prefix.
pub fn checkpoint_path(file_path: &str, file_name: &str) -> PathBuf {
    PathBuf::from(format!("{file_path}{file_name}{CHECKPOINT_EXTENSION}"))
}

/// File name unique within this process: nanoseconds since the Unix epoch
/// plus a counter for fits started within the same tick.
pub fn unique_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{nanos}_{n}")
}

/// Where the canonical post-training model came from.
#[derive(Debug, Clone)]
pub enum CheckpointResolution {
    /// Read back from the checkpoint file, inference-only.
    Loaded(AutoEncoder),
    /// No checkpoint on disk; an independent clone of the training model.
    Fallback(AutoEncoder),
}

impl CheckpointResolution {
    pub fn is_loaded(&self) -> bool {
        matches!(self, CheckpointResolution::Loaded(_))
    }

    pub fn into_model(self) -> AutoEncoder {
        match self {
            CheckpointResolution::Loaded(m) | CheckpointResolution::Fallback(m) => m,
        }
    }
}

/// Loads the best-model checkpoint at `path` if it exists, deleting it
/// afterwards unless `keep_file`. A missing file is not an error.
pub fn resolve_checkpoint(
    path: &Path,
    training_model: &AutoEncoder,
    keep_file: bool,
) -> Result<CheckpointResolution> {
    if !path.is_file() {
        debug!(path = %path.display(), "no checkpoint written, using a copy of the training model");
        return Ok(CheckpointResolution::Fallback(training_model.clone()));
    }

    let model = AutoEncoder::load_json(path)?.into_uncompiled();
    if !keep_file {
        std::fs::remove_file(path)?;
    }
    info!(path = %path.display(), kept = keep_file, "loaded best checkpoint");
    Ok(CheckpointResolution::Loaded(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix;
    use crate::network::builder::AeBiGruNetwork;
    use crate::network::config::NetworkConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model(seed: u64) -> AutoEncoder {
        let cfg = NetworkConfig { latent_space_dim: 2, n_layers: 1, n_units: Some(3.into()), ..NetworkConfig::default() };
        let (e, d) = AeBiGruNetwork::new(cfg).build_network((5, 2), &mut StdRng::seed_from_u64(seed)).unwrap();
        AutoEncoder::new((5, 2), e, d)
    }

    #[test]
    fn path_is_plain_concatenation() {
        assert_eq!(checkpoint_path("./", "best_model"), PathBuf::from("./best_model.json"));
        assert_eq!(checkpoint_path("/tmp/run_", "a"), PathBuf::from("/tmp/run_a.json"));
    }

    #[test]
    fn tokens_are_unique() {
        let a = unique_token();
        let b = unique_token();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_file_falls_back_to_independent_clone() {
        let dir = tempfile::TempDir::new().unwrap();
        let trained = model(1);
        let resolved = resolve_checkpoint(&dir.path().join("absent.json"), &trained, false).unwrap();
        assert!(!resolved.is_loaded());

        let mut copy = resolved.into_model();
        let x = Matrix::from_data(vec![vec![0.2, -0.4]; 5]);
        assert_eq!(copy.predict(&x).unwrap(), trained.predict(&x).unwrap());

        for p in copy.params_mut() {
            p.value.scale_in_place(0.0);
        }
        assert_ne!(copy.predict(&x).unwrap(), trained.predict(&x).unwrap());
    }

    #[test]
    fn loaded_checkpoint_is_deleted_unless_kept() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ckpt.json");
        let best = model(2);
        let x = Matrix::from_data(vec![vec![0.1, 0.3]; 5]);

        best.save_json(&path).unwrap();
        let resolved = resolve_checkpoint(&path, &model(3), false).unwrap();
        assert!(resolved.is_loaded());
        assert!(!path.exists());
        assert_eq!(resolved.into_model().predict(&x).unwrap(), best.predict(&x).unwrap());

        best.save_json(&path).unwrap();
        resolve_checkpoint(&path, &model(3), true).unwrap();
        assert!(path.exists());
    }
}
