pub mod detect;
pub mod predictor;
pub mod preprocess;

pub use detect::{detect_faces, CascadeDetector, DetectionResult, DetectorConfig, FaceFinder, Region};
pub use predictor::{EmotionModel, Prediction, Predictor};
