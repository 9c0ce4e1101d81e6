pub mod augment;
pub mod dataset;
pub mod flow;

pub use augment::Augment;
pub use dataset::{Dataset, Sample};
pub use flow::BatchFlow;
