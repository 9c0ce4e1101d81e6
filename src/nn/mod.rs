pub mod activation;
pub mod artifact;
pub mod builder;
pub mod conv;
pub mod dense;
pub mod dropout;
pub mod layer;
pub mod network;
pub mod norm;
pub mod param;
pub mod pool;
pub mod residual;

pub use activation::Activation;
pub use artifact::{load_model, save_model, ModelFile};
pub use builder::{ModelVariant, INPUT_SHAPE};
pub use layer::Layer;
pub use network::Network;
