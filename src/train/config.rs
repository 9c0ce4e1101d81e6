use crate::data::Augment;

/// Hyperparameters for one training run.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub augment: Augment,
}

impl Default for TrainConfig {
    fn default() -> TrainConfig {
        TrainConfig {
            epochs: 40,
            batch_size: 64,
            learning_rate: 1e-3,
            augment: Augment::default(),
        }
    }
}
