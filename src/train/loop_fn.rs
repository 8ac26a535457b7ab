use std::collections::BTreeMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::loss::loss_type::LossType;
use crate::math::matrix::Matrix;
use crate::model::autoencoder::AutoEncoder;
use crate::optim::optimizer::Optimizer;
use crate::train::callbacks::{Callback, TrainingContext};
use crate::train::epoch_stats::{EpochStats, History};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains a compiled `model` for `config.epochs` epochs and returns the
/// per-epoch history.
///
/// # Arguments
/// - `model`     — compiled model; updated in place
/// - `inputs`    — training samples, each `(n_timepoints, n_channels)`
/// - `targets`   — expected outputs, same length as `inputs`
/// - `config`    — epochs, batch size, shuffle seed, verbosity
/// - `callbacks` — run in order after every epoch
///
/// # Errors
/// - `NotCompiled` if `compile` was never called
/// - `EmptyData` / `Configuration` for empty or mismatched inputs
/// - `Training` as soon as an epoch produces a non-finite loss
/// - whatever a callback returns (e.g. an I/O error while checkpointing)
pub fn train_loop(
    model: &mut AutoEncoder,
    inputs: &[Matrix],
    targets: &[Matrix],
    config: &TrainConfig,
    callbacks: &mut [Box<dyn Callback>],
) -> Result<History> {
    let compiled = model.compile_config().cloned().ok_or(Error::NotCompiled)?;
    if inputs.is_empty() {
        return Err(Error::EmptyData);
    }
    if inputs.len() != targets.len() {
        return Err(Error::config(format!(
            "inputs and targets must have equal length ({} vs {})",
            inputs.len(),
            targets.len()
        )));
    }
    if config.batch_size == 0 || config.epochs == 0 {
        return Err(Error::config("epochs and batch_size must be at least 1"));
    }
    let metric_fns = compiled.metric_fns()?;

    let mut optimizer = compiled.optimizer.build();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut ctx = TrainingContext { learning_rate: optimizer.learning_rate(), stop_training: false };
    let mut history = History::default();

    for cb in callbacks.iter_mut() {
        cb.on_train_begin(&mut ctx)?;
    }

    for epoch in 1..=config.epochs {
        optimizer.set_learning_rate(ctx.learning_rate);
        let t_start = Instant::now();

        // ── One full pass over the training data ───────────────────────────
        let (loss, metrics) = run_one_epoch(
            model,
            inputs,
            targets,
            &mut optimizer,
            config.batch_size,
            compiled.loss,
            &metric_fns,
            &mut rng,
        )?;

        if !loss.is_finite() {
            return Err(Error::Training(format!("loss became {loss} at epoch {epoch}")));
        }

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            loss,
            metrics,
            learning_rate: ctx.learning_rate,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };

        if config.verbose {
            info!(epoch, total = config.epochs, loss, lr = ctx.learning_rate, "epoch finished");
        } else {
            debug!(epoch, total = config.epochs, loss, lr = ctx.learning_rate, "epoch finished");
        }

        for cb in callbacks.iter_mut() {
            cb.on_epoch_end(&stats, model, &mut ctx)?;
        }
        history.epochs.push(stats);

        if ctx.stop_training {
            info!(epoch, "training stopped by callback");
            break;
        }
    }

    for cb in callbacks.iter_mut() {
        cb.on_train_end(model, &mut ctx)?;
    }

    Ok(history)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Runs one full epoch of mini-batch updates over the training data.
/// Returns the mean loss and the mean of every metric over all samples.
#[allow(clippy::too_many_arguments)]
fn run_one_epoch(
    model: &mut AutoEncoder,
    inputs: &[Matrix],
    targets: &[Matrix],
    optimizer: &mut Optimizer,
    batch_size: usize,
    loss_type: LossType,
    metric_fns: &[(String, LossType)],
    rng: &mut StdRng,
) -> Result<(f64, BTreeMap<String, f64>)> {
    let n = inputs.len();
    let mut total_loss = 0.0;
    let mut metric_totals = vec![0.0; metric_fns.len()];

    // Shuffle sample order each epoch.
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    for batch_start in (0..n).step_by(batch_size) {
        let batch_end = (batch_start + batch_size).min(n);
        let actual_batch_size = (batch_end - batch_start) as f64;

        for param in model.params_mut() {
            param.zero_grad();
        }

        // Accumulate gradients over the mini-batch.
        for &idx in &indices[batch_start..batch_end] {
            let output = model.forward(&inputs[idx])?;
            let predicted = output.flatten();
            let expected = targets[idx].flatten();
            if predicted.len() != expected.len() {
                return Err(Error::ShapeMismatch {
                    expected: vec![targets[idx].rows, targets[idx].cols],
                    got: vec![output.rows, output.cols],
                });
            }

            total_loss += loss_type.loss(&predicted, &expected);
            for (total, (_, metric)) in metric_totals.iter_mut().zip(metric_fns.iter()) {
                *total += metric.loss(&predicted, &expected);
            }

            let error = loss_type.derivative(&predicted, &expected);
            let delta = Matrix::from_row(error)
                .reshape(output.rows, output.cols)
                .unwrap_or_default();
            model.backward(&delta)?;
        }

        // Average and apply.
        let inv_batch = 1.0 / actual_batch_size;
        let mut params = model.params_mut();
        for param in params.iter_mut() {
            param.grad.scale_in_place(inv_batch);
        }
        optimizer.step(&mut params);
    }

    let metrics = metric_fns.iter()
        .zip(metric_totals)
        .map(|((name, _), total)| (name.clone(), total / n as f64))
        .collect();
    Ok((total_loss / n as f64, metrics))
}
