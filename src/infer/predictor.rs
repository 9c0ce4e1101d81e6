use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::infer::detect::{detect_faces, DetectionResult, FaceFinder};
use crate::infer::preprocess;
use crate::labels::Emotion;
use crate::math::tensor::Tensor;
use crate::nn::{load_model, Network, INPUT_SHAPE};

/// Anything that maps an input tensor to class probabilities. The trained
/// [`Network`] is the real implementation; tests substitute canned outputs.
pub trait EmotionModel: Send {
    fn probabilities(&mut self, input: &Tensor) -> Vec<f64>;
}

impl EmotionModel for Network {
    fn probabilities(&mut self, input: &Tensor) -> Vec<f64> {
        self.forward(input, false).data
    }
}

/// Classification result for one region: the winning label, its probability,
/// and the full distribution in the fixed label order.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub emotion: Emotion,
    pub confidence: f64,
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Builds a prediction from a softmax distribution over the fixed label
    /// order. The winner is the highest probability; ties go to the earlier
    /// label.
    pub fn from_probabilities(probs: &[f64]) -> Prediction {
        let mut best = 0;
        for (i, &p) in probs.iter().enumerate().take(Emotion::COUNT) {
            if p > probs[best] {
                best = i;
            }
        }
        let probabilities: Vec<f64> = (0..Emotion::COUNT)
            .map(|i| probs.get(i).copied().unwrap_or(0.0))
            .collect();
        Prediction {
            emotion: Emotion::from_index(best).unwrap_or(Emotion::Angry),
            confidence: probabilities[best.min(Emotion::COUNT - 1)],
            probabilities,
        }
    }
}

/// Inference front end: preprocessing, optional face detection, and the
/// model, wired together behind one call.
pub struct Predictor<M: EmotionModel> {
    model: M,
    finder: Option<Box<dyn FaceFinder>>,
}

impl Predictor<Network> {
    /// Loads a trained model artifact and wraps it in a predictor with no
    /// face detection. The artifact's input shape must match what this build
    /// preprocesses to.
    pub fn from_model_file(path: &Path) -> Result<Predictor<Network>> {
        let model = load_model(path)?;
        if model.input_shape != INPUT_SHAPE {
            return Err(Error::ShapeMismatch {
                expected: INPUT_SHAPE,
                found: model.input_shape,
            });
        }
        Ok(Predictor::new(model.network))
    }
}

impl<M: EmotionModel> Predictor<M> {
    pub fn new(model: M) -> Predictor<M> {
        Predictor {
            model,
            finder: None,
        }
    }

    pub fn with_finder(mut self, finder: Box<dyn FaceFinder>) -> Predictor<M> {
        self.finder = Some(finder);
        self
    }

    /// Classifies an already-preprocessed 48×48×1 tensor.
    pub fn predict_tensor(&mut self, input: &Tensor) -> Prediction {
        Prediction::from_probabilities(&self.model.probabilities(input))
    }

    /// Full pipeline on encoded image bytes: decode to grayscale, locate
    /// faces (whole frame when none are found), classify each region.
    pub fn predict_bytes(&mut self, bytes: &[u8]) -> Result<(DetectionResult, Vec<Prediction>)> {
        let gray = preprocess::gray_from_bytes(bytes)?;
        let detection = detect_faces(self.finder.as_deref_mut(), &gray)?;
        let predictions = detection
            .regions()
            .iter()
            .map(|r| {
                let tensor = preprocess::crop_to_tensor(&gray, r.x, r.y, r.width, r.height);
                self.predict_tensor(&tensor)
            })
            .collect();
        Ok((detection, predictions))
    }

    /// Classifies the whole frame, skipping detection entirely.
    pub fn predict_whole(&mut self, bytes: &[u8]) -> Result<Prediction> {
        let tensor = preprocess::tensor_from_bytes(bytes)?;
        Ok(self.predict_tensor(&tensor))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infer::detect::Region;
    use image::{GrayImage, Luma};
    use std::io::Cursor;

    pub(crate) struct FixedModel(pub Vec<f64>);

    impl EmotionModel for FixedModel {
        fn probabilities(&mut self, _input: &Tensor) -> Vec<f64> {
            self.0.clone()
        }
    }

    /// Says happy for bright crops and sad for dark ones, so per-region
    /// classification is observable.
    pub(crate) struct TwoToneModel;

    impl EmotionModel for TwoToneModel {
        fn probabilities(&mut self, input: &Tensor) -> Vec<f64> {
            let mean = input.data.iter().sum::<f64>() / input.data.len() as f64;
            let mut probs = vec![0.0; Emotion::COUNT];
            let winner = if mean > 0.5 { Emotion::Happy } else { Emotion::Sad };
            probs[winner.index()] = 1.0;
            probs
        }
    }

    pub(crate) struct StubFinder(pub Vec<Region>);

    impl FaceFinder for StubFinder {
        fn find_faces(&mut self, _image: &GrayImage) -> Result<Vec<Region>> {
            Ok(self.0.clone())
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = GrayImage::from_pixel(96, 96, Luma([60]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    /// 96×96 image with a dark left half and a bright right half.
    pub(crate) fn split_png() -> Vec<u8> {
        let img = GrayImage::from_fn(96, 96, |x, _| {
            if x < 48 {
                Luma([0])
            } else {
                Luma([255])
            }
        });
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn argmax_picks_the_winning_label() {
        let mut probs = vec![0.0; 7];
        probs[Emotion::Happy.index()] = 0.8;
        probs[Emotion::Sad.index()] = 0.2;
        let p = Prediction::from_probabilities(&probs);
        assert_eq!(p.emotion, Emotion::Happy);
        assert_eq!(p.confidence, 0.8);
        assert_eq!(p.probabilities[Emotion::Sad.index()], 0.2);
        assert_eq!(p.probabilities.len(), 7);
    }

    #[test]
    fn ties_resolve_to_the_earlier_label() {
        let probs = vec![0.3, 0.3, 0.1, 0.1, 0.1, 0.05, 0.05];
        let p = Prediction::from_probabilities(&probs);
        assert_eq!(p.emotion, Emotion::Angry);
    }

    #[test]
    fn predict_bytes_without_finder_classifies_whole_frame() {
        let mut probs = vec![0.0; 7];
        probs[Emotion::Neutral.index()] = 1.0;
        let mut predictor = Predictor::new(FixedModel(probs));
        let (detection, predictions) = predictor.predict_bytes(&png_bytes()).unwrap();
        assert!(detection.used_fallback());
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].emotion, Emotion::Neutral);
    }

    #[test]
    fn each_detected_region_gets_its_own_prediction() {
        let left = Region {
            x: 0,
            y: 0,
            width: 48,
            height: 96,
        };
        let right = Region {
            x: 48,
            y: 0,
            width: 48,
            height: 96,
        };
        let mut predictor =
            Predictor::new(TwoToneModel).with_finder(Box::new(StubFinder(vec![left, right])));

        let (detection, predictions) = predictor.predict_bytes(&split_png()).unwrap();
        assert!(!detection.used_fallback());
        assert_eq!(detection.regions().len(), 2);
        assert_eq!(predictions.len(), 2);
        // Predictions line up with their regions: dark left half, bright right.
        assert_eq!(predictions[0].emotion, Emotion::Sad);
        assert_eq!(predictions[1].emotion, Emotion::Happy);
    }

    #[test]
    fn unreadable_bytes_propagate_a_decode_error() {
        let mut predictor = Predictor::new(FixedModel(vec![0.0; 7]));
        assert!(matches!(
            predictor.predict_bytes(b"nope"),
            Err(Error::ImageDecode(_))
        ));
    }
}
