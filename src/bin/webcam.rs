//! Live webcam demo: grabs frames, finds faces, and overlays the predicted
//! emotion on each one. Requires the `webcam` feature (OpenCV bindings) for
//! capture and display; the model and detection pipeline are the same as in
//! the other front ends.

use std::path::{Path, PathBuf};

use opencv::core::{Point, Rect, Scalar};
use opencv::prelude::*;
use opencv::{highgui, imgproc, videoio};

use emonet::infer::{detect_faces, preprocess, CascadeDetector, DetectorConfig, FaceFinder};
use emonet::Predictor;

const MODEL_PATH: &str = "models/emotion_model.json";
const DETECTOR_PATH: &str = "models/seeta_fd.bin";
const WINDOW: &str = "emotion recognition";

fn gray_image_from_mat(mat: &Mat) -> Result<image::GrayImage, Box<dyn std::error::Error>> {
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    let bytes = mat.data_bytes()?.to_vec();
    image::GrayImage::from_raw(width, height, bytes)
        .ok_or_else(|| "frame buffer size mismatch".into())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut predictor = Predictor::from_model_file(Path::new(MODEL_PATH))?;
    let detector_path = PathBuf::from(DETECTOR_PATH);
    let mut finder: Option<Box<dyn FaceFinder>> = if detector_path.exists() {
        Some(Box::new(CascadeDetector::from_model(
            &detector_path,
            &DetectorConfig::default(),
        )?))
    } else {
        println!("no face detector model found, classifying whole frames");
        None
    };

    let mut capture = videoio::VideoCapture::new(0, videoio::CAP_ANY)?;
    if !capture.is_opened()? {
        eprintln!("could not open the webcam");
        std::process::exit(1);
    }

    let mut frame = Mat::default();
    let mut gray = Mat::default();
    loop {
        if !capture.read(&mut frame)? || frame.empty() {
            eprintln!("could not read a frame from the webcam");
            break;
        }

        imgproc::cvt_color(&frame, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;
        let gray_image = gray_image_from_mat(&gray)?;
        let detection = detect_faces(finder.as_deref_mut(), &gray_image)?;

        for region in detection.regions() {
            let tensor = preprocess::crop_to_tensor(
                &gray_image,
                region.x,
                region.y,
                region.width,
                region.height,
            );
            let prediction = predictor.predict_tensor(&tensor);

            let rect = Rect::new(
                region.x as i32,
                region.y as i32,
                region.width as i32,
                region.height as i32,
            );
            imgproc::rectangle(&mut frame, rect, Scalar::new(255.0, 0.0, 0.0, 0.0), 2, imgproc::LINE_8, 0)?;
            imgproc::put_text(
                &mut frame,
                prediction.emotion.as_str(),
                Point::new(region.x as i32, region.y as i32 - 10),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.9,
                Scalar::new(255.0, 0.0, 0.0, 0.0),
                2,
                imgproc::LINE_8,
                false,
            )?;
        }

        highgui::imshow(WINDOW, &frame)?;
        // Quit on "q".
        if highgui::wait_key(1)? == i32::from(b'q') {
            break;
        }
    }

    capture.release()?;
    highgui::destroy_all_windows()?;
    Ok(())
}
