//! Classifies a single image file, printing every detected face's emotion
//! and saving an annotated copy with the face rectangles drawn in.

use std::path::{Path, PathBuf};
use std::process;

use image::{Rgb, RgbImage};

use emonet::infer::{CascadeDetector, DetectorConfig, Region};
use emonet::Predictor;

const IMAGE_PATH: &str = "test_face.jpg";
const OUTPUT_PATH: &str = "result.png";
const MODEL_PATH: &str = "models/emotion_model.json";
const DETECTOR_PATH: &str = "models/seeta_fd.bin";

fn draw_rectangle(img: &mut RgbImage, region: &Region, color: Rgb<u8>) {
    let x1 = region.x.min(img.width().saturating_sub(1));
    let y1 = region.y.min(img.height().saturating_sub(1));
    let x2 = (region.x + region.width).min(img.width()).saturating_sub(1);
    let y2 = (region.y + region.height).min(img.height()).saturating_sub(1);
    for x in x1..=x2 {
        img.put_pixel(x, y1, color);
        img.put_pixel(x, y2, color);
    }
    for y in y1..=y2 {
        img.put_pixel(x1, y, color);
        img.put_pixel(x2, y, color);
    }
}

fn main() -> emonet::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let bytes = match std::fs::read(IMAGE_PATH) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("could not read {}: {}", IMAGE_PATH, e);
            process::exit(1);
        }
    };

    let mut predictor = Predictor::from_model_file(Path::new(MODEL_PATH))?;
    let detector_path = PathBuf::from(DETECTOR_PATH);
    if detector_path.exists() {
        let detector = CascadeDetector::from_model(&detector_path, &DetectorConfig::default())?;
        predictor = predictor.with_finder(Box::new(detector));
    } else {
        println!("no face detector model found, classifying the whole image");
    }

    let (detection, predictions) = predictor.predict_bytes(&bytes)?;
    if detection.used_fallback() {
        println!("no face detected, falling back to the whole image");
    } else {
        println!("{} face(s) detected", predictions.len());
    }

    let mut annotated = image::load_from_memory(&bytes)?.to_rgb8();
    for (region, prediction) in detection.regions().iter().zip(&predictions) {
        println!(
            "  [{}x{} at {},{}] {} ({:.1}%)",
            region.width,
            region.height,
            region.x,
            region.y,
            prediction.emotion,
            prediction.confidence * 100.0
        );
        draw_rectangle(&mut annotated, region, Rgb([0, 255, 0]));
    }
    annotated.save(OUTPUT_PATH)?;
    println!("annotated image saved to {}", OUTPUT_PATH);
    Ok(())
}
