use std::path::PathBuf;

use thiserror::Error;

use crate::math::tensor::Shape;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("model (de)serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("label schema mismatch: model was trained with {found:?}, this build expects {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("unsupported label schema version {0}")]
    SchemaVersion(u32),

    #[error("shape mismatch: expected {expected}, got {found}")]
    ShapeMismatch { expected: Shape, found: Shape },

    #[error("no usable samples found under {0}")]
    EmptyDataset(PathBuf),

    #[error("face detector error: {0}")]
    Detector(String),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, Error>;
