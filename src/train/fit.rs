use std::path::Path;
use std::time::Instant;

use log::info;

use crate::data::BatchFlow;
use crate::error::Result;
use crate::labels::LabelSchema;
use crate::loss::CrossEntropyLoss;
use crate::math::tensor::Tensor;
use crate::nn::{save_model, ModelVariant, Network, INPUT_SHAPE};
use crate::optim::Adam;
use crate::train::callbacks::{Checkpoint, EarlyStopping, ReduceLrOnPlateau};
use crate::train::config::TrainConfig;
use crate::train::stats::EpochStats;

/// Summary of a completed training run.
#[derive(Debug)]
pub struct FitReport {
    pub history: Vec<EpochStats>,
    pub best_val_accuracy: f64,
    pub stopped_early: bool,
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// One pass over the training stream: forward, backward, averaged gradient
/// step per batch. Returns (mean loss, accuracy).
fn run_train_epoch(
    network: &mut Network,
    flow: &mut BatchFlow,
    optimizer: &mut Adam,
) -> Result<(f64, f64)> {
    let mut loss_sum = 0.0;
    let mut correct = 0usize;
    let mut seen = 0usize;

    for _ in 0..flow.steps_per_epoch() {
        let (images, targets) = flow.next_batch()?;
        network.zero_grads();
        for (image, target) in images.iter().zip(targets.iter()) {
            let output = network.forward(image, true);
            loss_sum += CrossEntropyLoss::loss(&output.data, target);
            if argmax(&output.data) == argmax(target) {
                correct += 1;
            }
            let delta = CrossEntropyLoss::derivative(&output.data, target);
            network.backward(&Tensor::vector(delta));
        }
        network.scale_grads(1.0 / images.len() as f64);
        optimizer.step(network.params_mut());
        seen += images.len();
    }

    Ok((loss_sum / seen as f64, correct as f64 / seen as f64))
}

/// One pass over the validation stream in eval mode. Returns (mean loss,
/// accuracy).
fn run_val_epoch(network: &mut Network, flow: &mut BatchFlow) -> Result<(f64, f64)> {
    let mut loss_sum = 0.0;
    let mut correct = 0usize;
    let mut seen = 0usize;

    for _ in 0..flow.steps_per_epoch() {
        let (images, targets) = flow.next_batch()?;
        for (image, target) in images.iter().zip(targets.iter()) {
            let output = network.forward(image, false);
            loss_sum += CrossEntropyLoss::loss(&output.data, target);
            if argmax(&output.data) == argmax(target) {
                correct += 1;
            }
        }
        seen += images.len();
    }

    Ok((loss_sum / seen as f64, correct as f64 / seen as f64))
}

/// Trains a network with per-epoch checkpointing, learning rate reduction on
/// a validation loss plateau, and early stopping with best-weight restore.
///
/// The best-by-validation-accuracy weights are written to `checkpoint_path`
/// as a full model artifact after every improving epoch.
pub fn fit(
    network: &mut Network,
    variant: ModelVariant,
    train_flow: &mut BatchFlow,
    val_flow: &mut BatchFlow,
    optimizer: &mut Adam,
    config: &TrainConfig,
    checkpoint_path: &Path,
) -> Result<FitReport> {
    let schema = LabelSchema::current();
    let mut checkpoint = Checkpoint::new();
    let mut plateau = ReduceLrOnPlateau::new();
    let mut early = EarlyStopping::new();

    info!(
        "training {} on {} samples, validating on {} ({} epochs, batch {})",
        variant,
        train_flow.samples(),
        val_flow.samples(),
        config.epochs,
        config.batch_size
    );

    let mut history = Vec::with_capacity(config.epochs);
    let mut stopped_early = false;

    for epoch in 1..=config.epochs {
        let started = Instant::now();
        let (train_loss, train_accuracy) = run_train_epoch(network, train_flow, optimizer)?;
        let (val_loss, val_accuracy) = run_val_epoch(network, val_flow)?;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            learning_rate: optimizer.learning_rate,
            elapsed_ms: started.elapsed().as_millis(),
        };
        info!("{}", stats);
        history.push(stats);

        if checkpoint.observe(val_accuracy) {
            save_model(checkpoint_path, variant, &schema, INPUT_SHAPE, network)?;
            info!(
                "val_accuracy improved to {:.4}, checkpoint written to {}",
                val_accuracy,
                checkpoint_path.display()
            );
        }

        if let Some(reduced) = plateau.observe(val_loss, optimizer.learning_rate) {
            info!(
                "val_loss plateaued, reducing learning rate {:.2e} -> {:.2e}",
                optimizer.learning_rate, reduced
            );
            optimizer.learning_rate = reduced;
        }

        if early.observe(val_loss, network)? {
            info!("val_loss stalled for {} epochs, stopping early", early.patience);
            early.restore_best(network)?;
            stopped_early = true;
            break;
        }
    }

    Ok(FitReport {
        history,
        best_val_accuracy: checkpoint.best(),
        stopped_early,
    })
}
