use std::path::Path;

use image::GrayImage;
use rustface::ImageData;

use crate::error::{Error, Result};

/// Axis-aligned face rectangle in full-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn whole(image: &GrayImage) -> Region {
        Region {
            x: 0,
            y: 0,
            width: image.width(),
            height: image.height(),
        }
    }
}

/// What the face pass produced for one image. When the cascade finds nothing
/// the whole frame is classified instead, so a prediction always comes back.
#[derive(Debug, Clone)]
pub enum DetectionResult {
    Faces(Vec<Region>),
    WholeImage(Region),
}

impl DetectionResult {
    pub fn regions(&self) -> &[Region] {
        match self {
            DetectionResult::Faces(regions) => regions,
            DetectionResult::WholeImage(region) => std::slice::from_ref(region),
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(self, DetectionResult::WholeImage(_))
    }
}

/// A face locator. Implementations take `&mut self` because cascade
/// detectors keep internal pyramid buffers between calls.
pub trait FaceFinder: Send {
    fn find_faces(&mut self, image: &GrayImage) -> Result<Vec<Region>>;
}

/// Tuning for the cascade detector, mirroring the usual Haar knobs: the
/// pyramid shrinks by `scale_factor` per level and `min_neighbors` sets how
/// much agreement a window needs before it counts as a face.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub scale_factor: f64,
    pub min_neighbors: u32,
    pub min_face_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> DetectorConfig {
        DetectorConfig {
            scale_factor: 1.3,
            min_neighbors: 5,
            min_face_size: 20,
        }
    }
}

/// Cascade face detector backed by a SeetaFace model file.
pub struct CascadeDetector {
    detector: Box<dyn rustface::Detector>,
}

impl CascadeDetector {
    pub fn from_model(path: &Path, config: &DetectorConfig) -> Result<CascadeDetector> {
        let mut detector = rustface::create_detector(
            path.to_str()
                .ok_or_else(|| Error::Detector(format!("non-UTF-8 model path {:?}", path)))?,
        )
        .map_err(|e| Error::Detector(e.to_string()))?;

        detector.set_min_face_size(config.min_face_size);
        // min_neighbors maps onto the per-window score threshold; higher
        // means fewer, more confident detections.
        detector.set_score_thresh(config.min_neighbors as f64);
        detector.set_pyramid_scale_factor((1.0 / config.scale_factor) as f32);
        detector.set_slide_window_step(4, 4);

        Ok(CascadeDetector { detector })
    }
}

// SAFETY: `create_detector` always returns rustface's `FuStDetector`, whose
// fields are all owned `Send` data; only the `Box<dyn Detector>` erasure
// hides that from the compiler.
unsafe impl Send for CascadeDetector {}

impl FaceFinder for CascadeDetector {
    fn find_faces(&mut self, image: &GrayImage) -> Result<Vec<Region>> {
        let data = ImageData::new(image.as_raw(), image.width(), image.height());
        let faces = self.detector.detect(&data);
        Ok(faces
            .iter()
            .map(|f| {
                let bbox = f.bbox();
                Region {
                    x: bbox.x().max(0) as u32,
                    y: bbox.y().max(0) as u32,
                    width: bbox.width(),
                    height: bbox.height(),
                }
            })
            .collect())
    }
}

/// Runs the finder and falls back to the whole frame when it reports nothing.
/// With no finder at all the whole frame is used directly.
pub fn detect_faces(
    finder: Option<&mut (dyn FaceFinder + 'static)>,
    image: &GrayImage,
) -> Result<DetectionResult> {
    if let Some(finder) = finder {
        let regions = finder.find_faces(image)?;
        if !regions.is_empty() {
            return Ok(DetectionResult::Faces(regions));
        }
    }
    Ok(DetectionResult::WholeImage(Region::whole(image)))
}
