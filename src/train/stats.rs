use std::fmt;

/// Metrics for one completed epoch.
#[derive(Debug, Clone)]
pub struct EpochStats {
    pub epoch: usize,
    pub total_epochs: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val_loss: f64,
    pub val_accuracy: f64,
    pub learning_rate: f64,
    pub elapsed_ms: u128,
}

impl fmt::Display for EpochStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {}/{} - loss {:.4} acc {:.2}% - val_loss {:.4} val_acc {:.2}% - lr {:.2e} - {}ms",
            self.epoch,
            self.total_epochs,
            self.train_loss,
            self.train_accuracy * 100.0,
            self.val_loss,
            self.val_accuracy * 100.0,
            self.learning_rate,
            self.elapsed_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_a_single_log_line() {
        let stats = EpochStats {
            epoch: 3,
            total_epochs: 40,
            train_loss: 1.2345,
            train_accuracy: 0.5,
            val_loss: 1.5,
            val_accuracy: 0.444,
            learning_rate: 1e-3,
            elapsed_ms: 820,
        };
        let line = stats.to_string();
        assert!(line.contains("epoch 3/40"));
        assert!(line.contains("val_acc 44.40%"));
    }
}
