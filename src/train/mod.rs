pub mod callbacks;
pub mod config;
pub mod fit;
pub mod stats;

pub use callbacks::{Checkpoint, EarlyStopping, ReduceLrOnPlateau};
pub use config::TrainConfig;
pub use fit::{fit, FitReport};
pub use stats::EpochStats;
