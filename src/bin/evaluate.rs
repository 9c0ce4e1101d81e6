//! Quick accuracy check: classifies a small sample of held-out images and
//! prints per-image results plus the overall hit rate.

use std::path::Path;

use rand::seq::SliceRandom;

use emonet::{Dataset, Predictor};

const DATA_DIR: &str = "data/test";
const MODEL_PATH: &str = "models/emotion_model.json";
const MAX_IMAGES: usize = 20;

fn main() -> emonet::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let dataset = Dataset::from_dir(Path::new(DATA_DIR))?;
    let mut predictor = Predictor::from_model_file(Path::new(MODEL_PATH))?;

    // Random sample across the whole test set.
    let mut picked: Vec<usize> = (0..dataset.len()).collect();
    picked.shuffle(&mut rand::thread_rng());
    picked.truncate(MAX_IMAGES);

    if picked.is_empty() {
        println!("no images found under {}", DATA_DIR);
        return Ok(());
    }

    let mut correct = 0usize;
    for &index in &picked {
        let sample = &dataset.samples[index];
        let tensor = dataset.load_tensor(index)?;
        let prediction = predictor.predict_tensor(&tensor);
        let hit = prediction.emotion == sample.label;
        if hit {
            correct += 1;
        }
        println!(
            "{} {} {:10} -> {:10} ({:.1}%)",
            if hit { "+" } else { "-" },
            sample.path.display(),
            sample.label.as_str(),
            prediction.emotion.as_str(),
            prediction.confidence * 100.0
        );
    }

    println!(
        "\naccuracy: {}/{} ({:.1}%)",
        correct,
        picked.len(),
        correct as f64 / picked.len() as f64 * 100.0
    );
    Ok(())
}
