//! HTTP API entry point. Uploads are classified over the whole image; the
//! face-cropping path is used by the script front ends.

use std::path::PathBuf;

use emonet::serve::{run, ServeConfig};

const ADDR: &str = "0.0.0.0:8000";
const MODEL_PATH: &str = "models/emotion_model.json";

fn main() -> emonet::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(&ServeConfig {
        addr: ADDR.to_owned(),
        model_path: PathBuf::from(MODEL_PATH),
        detector_path: None,
    })
}
