//! Trains an emotion model on a directory-per-label image dataset and writes
//! the best checkpoint (by validation accuracy) to disk.

use std::path::Path;

use emonet::{fit, Adam, BatchFlow, Dataset, ModelVariant, TrainConfig};

const TRAIN_DIR: &str = "data/train";
const VAL_DIR: &str = "data/test";
const MODEL_PATH: &str = "models/emotion_model.json";
const VARIANT: ModelVariant = ModelVariant::Residual;

fn main() -> emonet::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = TrainConfig::default();

    let train = Dataset::from_dir(Path::new(TRAIN_DIR))?;
    let val = Dataset::from_dir(Path::new(VAL_DIR))?;
    println!(
        "found {} training and {} validation samples",
        train.len(),
        val.len()
    );

    let mut train_flow = BatchFlow::training(train, config.batch_size, config.augment.clone())?;
    let mut val_flow = BatchFlow::validation(val, config.batch_size)?;

    let mut network = VARIANT.build();
    let mut optimizer = Adam::new(config.learning_rate);

    let report = fit(
        &mut network,
        VARIANT,
        &mut train_flow,
        &mut val_flow,
        &mut optimizer,
        &config,
        Path::new(MODEL_PATH),
    )?;

    println!(
        "done after {} epoch(s){}",
        report.history.len(),
        if report.stopped_early { " (stopped early)" } else { "" }
    );
    println!(
        "best validation accuracy: {:.2}%",
        report.best_val_accuracy * 100.0
    );
    println!("model saved to {}", MODEL_PATH);
    Ok(())
}
