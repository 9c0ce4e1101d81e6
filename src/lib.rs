pub mod data;
pub mod error;
pub mod infer;
pub mod labels;
pub mod loss;
pub mod math;
pub mod nn;
pub mod optim;
pub mod serve;
pub mod train;

// Convenience re-exports
pub use data::{Augment, BatchFlow, Dataset};
pub use error::{Error, Result};
pub use infer::{Prediction, Predictor};
pub use labels::{Emotion, LabelSchema};
pub use math::tensor::{Shape, Tensor};
pub use nn::{load_model, save_model, ModelVariant, Network, INPUT_SHAPE};
pub use optim::Adam;
pub use train::{fit, TrainConfig};
