use std::path::{Path, PathBuf};

use log::warn;

use crate::error::Result;
use crate::infer::preprocess;
use crate::labels::Emotion;
use crate::math::tensor::Tensor;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// One labeled image on disk.
#[derive(Debug, Clone)]
pub struct Sample {
    pub path: PathBuf,
    pub label: Emotion,
}

/// A labeled image collection rooted at a directory with one subdirectory
/// per label name. Label directories that are missing or unreadable are
/// logged and skipped; whether anything remains is checked when a batch
/// flow is built over the dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub root: PathBuf,
    pub samples: Vec<Sample>,
}

impl Dataset {
    pub fn from_dir(root: &Path) -> Result<Dataset> {
        let mut samples = Vec::new();

        for &label in &Emotion::ALL {
            let label_dir = root.join(label.as_str());
            if !label_dir.is_dir() {
                warn!("label directory {} is missing, skipping", label_dir.display());
                continue;
            }
            let entries = match std::fs::read_dir(&label_dir) {
                Ok(e) => e,
                Err(e) => {
                    warn!(
                        "cannot read label directory {}: {}, skipping",
                        label_dir.display(),
                        e
                    );
                    continue;
                }
            };

            let mut paths: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| {
                    p.extension()
                        .and_then(|s| s.to_str())
                        .map(|ext| {
                            IMAGE_EXTENSIONS
                                .iter()
                                .any(|known| ext.eq_ignore_ascii_case(known))
                        })
                        .unwrap_or(false)
                })
                .collect();
            paths.sort();

            if paths.is_empty() {
                warn!("label directory {} has no images", label_dir.display());
            }
            samples.extend(paths.into_iter().map(|path| Sample { path, label }));
        }

        Ok(Dataset {
            root: root.to_path_buf(),
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Loads one sample as a normalized 48×48×1 tensor.
    pub fn load_tensor(&self, index: usize) -> Result<Tensor> {
        let bytes = std::fs::read(&self.samples[index].path)?;
        preprocess::tensor_from_bytes(&bytes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    pub(crate) fn write_test_dataset(root: &Path, labels: &[(Emotion, usize)]) {
        for &(label, count) in labels {
            let dir = root.join(label.as_str());
            std::fs::create_dir_all(&dir).unwrap();
            for i in 0..count {
                let img = GrayImage::from_pixel(16, 16, Luma([((i * 40) % 255) as u8]));
                img.save(dir.join(format!("{}.png", i))).unwrap();
            }
        }
    }

    #[test]
    fn scans_label_directories_in_fixed_order() {
        let dir = tempfile::tempdir().unwrap();
        write_test_dataset(dir.path(), &[(Emotion::Happy, 2), (Emotion::Angry, 3)]);

        let ds = Dataset::from_dir(dir.path()).unwrap();
        assert_eq!(ds.len(), 5);
        // angry precedes happy in the fixed label order.
        assert_eq!(ds.samples[0].label, Emotion::Angry);
        assert_eq!(ds.samples[3].label, Emotion::Happy);
    }

    #[test]
    fn missing_label_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_test_dataset(dir.path(), &[(Emotion::Sad, 1)]);
        let ds = Dataset::from_dir(dir.path()).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn non_image_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_test_dataset(dir.path(), &[(Emotion::Fear, 1)]);
        std::fs::write(dir.path().join("fear").join("notes.txt"), "x").unwrap();
        let ds = Dataset::from_dir(dir.path()).unwrap();
        assert_eq!(ds.len(), 1);
    }

    #[test]
    fn load_tensor_normalizes_to_input_shape() {
        let dir = tempfile::tempdir().unwrap();
        write_test_dataset(dir.path(), &[(Emotion::Neutral, 1)]);
        let ds = Dataset::from_dir(dir.path()).unwrap();
        let t = ds.load_tensor(0).unwrap();
        assert_eq!(t.shape, crate::nn::INPUT_SHAPE);
        assert!(t.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }
}
