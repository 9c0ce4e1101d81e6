//! End-to-end checks over the public API: train artifacts round-trip through
//! disk, the predictor consumes real encoded images, and the upload handler
//! speaks the documented JSON contract.

use std::io::Cursor;

use image::{GrayImage, Luma};

use emonet::serve::handlers::predict_upload;
use emonet::{
    load_model, save_model, Emotion, LabelSchema, ModelVariant, Predictor, INPUT_SHAPE,
};

fn png_bytes(side: u32, value: u8) -> Vec<u8> {
    let img = GrayImage::from_pixel(side, side, Luma([value]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn multipart_upload(file_bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "pipelineboundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"face.png\"\r\n\r\n",
    );
    body.extend_from_slice(file_bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

#[test]
fn saved_model_serves_predictions_on_encoded_images() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let network = ModelVariant::Baseline.build();
    save_model(
        &path,
        ModelVariant::Baseline,
        &LabelSchema::current(),
        INPUT_SHAPE,
        &network,
    )
    .unwrap();

    let mut predictor = Predictor::from_model_file(&path).unwrap();
    let (detection, predictions) = predictor.predict_bytes(&png_bytes(96, 128)).unwrap();

    // No detector configured, so the whole frame is classified.
    assert!(detection.used_fallback());
    assert_eq!(predictions.len(), 1);

    let p = &predictions[0];
    assert!(Emotion::ALL.contains(&p.emotion));
    assert_eq!(p.probabilities.len(), Emotion::COUNT);
    let total: f64 = p.probabilities.iter().sum();
    assert!((total - 1.0).abs() < 1e-6);
    assert!((0.0..=1.0).contains(&p.confidence));
}

#[test]
fn upload_handler_returns_the_documented_contract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let network = ModelVariant::Residual.build();
    save_model(
        &path,
        ModelVariant::Residual,
        &LabelSchema::current(),
        INPUT_SHAPE,
        &network,
    )
    .unwrap();
    let mut predictor = Predictor::from_model_file(&path).unwrap();

    let (content_type, body) = multipart_upload(&png_bytes(64, 200));
    let (status, value) = predict_upload(&mut predictor, Some(&content_type), &body);

    assert_eq!(status, 200);
    assert!(value["emotion"].is_string());
    assert!(value["confidence"].is_f64());
    let probs = value["probabilities"].as_array().unwrap();
    assert_eq!(probs.len(), Emotion::COUNT);
    let total: f64 = probs.iter().filter_map(|v| v.as_f64()).sum();
    assert!((total - 1.0).abs() < 1e-6);
}

#[test]
fn upload_handler_rejects_garbage_with_a_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let network = ModelVariant::Baseline.build();
    save_model(
        &path,
        ModelVariant::Baseline,
        &LabelSchema::current(),
        INPUT_SHAPE,
        &network,
    )
    .unwrap();
    let mut predictor = Predictor::from_model_file(&path).unwrap();

    let (content_type, body) = multipart_upload(b"not an image at all");
    let (status, value) = predict_upload(&mut predictor, Some(&content_type), &body);
    assert_eq!(status, 400);
    assert!(value["error"].is_string());
}

#[test]
fn tampered_format_version_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let network = ModelVariant::Baseline.build();
    save_model(
        &path,
        ModelVariant::Baseline,
        &LabelSchema::current(),
        INPUT_SHAPE,
        &network,
    )
    .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let tampered = text.replacen("\"format_version\": 1", "\"format_version\": 99", 1);
    assert_ne!(text, tampered);
    std::fs::write(&path, tampered).unwrap();

    assert!(matches!(
        load_model(&path),
        Err(emonet::Error::InvalidModel(_))
    ));
}
