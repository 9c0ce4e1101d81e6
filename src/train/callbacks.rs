use crate::error::Result;
use crate::nn::Network;

/// Tracks the best validation accuracy seen so far. `observe` returns true
/// exactly when the new value strictly improves on the best, which is when
/// the caller should write a checkpoint; ties keep the earlier epoch.
#[derive(Debug)]
pub struct Checkpoint {
    best: f64,
}

impl Checkpoint {
    pub fn new() -> Checkpoint {
        Checkpoint {
            best: f64::NEG_INFINITY,
        }
    }

    pub fn observe(&mut self, val_accuracy: f64) -> bool {
        if val_accuracy > self.best {
            self.best = val_accuracy;
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }
}

impl Default for Checkpoint {
    fn default() -> Checkpoint {
        Checkpoint::new()
    }
}

/// Halves the learning rate when validation loss stops improving.
///
/// After `patience` consecutive epochs without improvement the current rate
/// is multiplied by `factor`, clamped below at `min_lr`, and the wait counter
/// resets.
#[derive(Debug)]
pub struct ReduceLrOnPlateau {
    pub factor: f64,
    pub patience: usize,
    pub min_lr: f64,
    best: f64,
    wait: usize,
}

impl ReduceLrOnPlateau {
    pub fn new() -> ReduceLrOnPlateau {
        ReduceLrOnPlateau {
            factor: 0.5,
            patience: 3,
            min_lr: 1e-6,
            best: f64::INFINITY,
            wait: 0,
        }
    }

    /// Returns the reduced learning rate when a reduction fires.
    pub fn observe(&mut self, val_loss: f64, current_lr: f64) -> Option<f64> {
        if val_loss < self.best {
            self.best = val_loss;
            self.wait = 0;
            return None;
        }
        self.wait += 1;
        if self.wait < self.patience {
            return None;
        }
        self.wait = 0;
        let reduced = (current_lr * self.factor).max(self.min_lr);
        if reduced < current_lr {
            Some(reduced)
        } else {
            None
        }
    }
}

impl Default for ReduceLrOnPlateau {
    fn default() -> ReduceLrOnPlateau {
        ReduceLrOnPlateau::new()
    }
}

/// Stops training after `patience` epochs without a validation loss
/// improvement, keeping a snapshot of the best-seen weights so they can be
/// restored when the stop triggers.
#[derive(Debug)]
pub struct EarlyStopping {
    pub patience: usize,
    best: f64,
    wait: usize,
    best_snapshot: Option<serde_json::Value>,
}

impl EarlyStopping {
    pub fn new() -> EarlyStopping {
        EarlyStopping {
            patience: 8,
            best: f64::INFINITY,
            wait: 0,
            best_snapshot: None,
        }
    }

    /// Returns true when training should stop.
    pub fn observe(&mut self, val_loss: f64, network: &Network) -> Result<bool> {
        if val_loss < self.best {
            self.best = val_loss;
            self.wait = 0;
            self.best_snapshot = Some(network.snapshot()?);
            return Ok(false);
        }
        self.wait += 1;
        Ok(self.wait >= self.patience)
    }

    /// Rolls the network back to the best-seen epoch, if one was recorded.
    pub fn restore_best(&mut self, network: &mut Network) -> Result<()> {
        if let Some(snapshot) = self.best_snapshot.take() {
            network.restore(snapshot)?;
        }
        Ok(())
    }
}

impl Default for EarlyStopping {
    fn default() -> EarlyStopping {
        EarlyStopping::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::{Shape, Tensor};
    use crate::nn::activation::Activation;
    use crate::nn::dense::Dense;
    use crate::nn::layer::{Flatten, Layer};

    fn tiny_net() -> Network {
        Network::new(vec![
            Layer::Flatten(Flatten::new()),
            Layer::Dense(Dense::new(4, 3, Activation::Softmax)),
        ])
    }

    #[test]
    fn checkpoint_fires_only_on_strict_improvement() {
        let mut cp = Checkpoint::new();
        assert!(cp.observe(0.40));
        assert!(!cp.observe(0.40));
        assert!(!cp.observe(0.35));
        assert!(cp.observe(0.41));
        assert_eq!(cp.best(), 0.41);
    }

    #[test]
    fn plateau_reduces_after_patience_epochs() {
        let mut plateau = ReduceLrOnPlateau::new();
        assert_eq!(plateau.observe(1.0, 1e-3), None);
        assert_eq!(plateau.observe(1.1, 1e-3), None);
        assert_eq!(plateau.observe(1.1, 1e-3), None);
        assert_eq!(plateau.observe(1.1, 1e-3), Some(5e-4));
        // Counter resets after a reduction.
        assert_eq!(plateau.observe(1.1, 5e-4), None);
    }

    #[test]
    fn plateau_respects_the_floor() {
        let mut plateau = ReduceLrOnPlateau::new();
        plateau.observe(1.0, 2e-6);
        for _ in 0..2 {
            plateau.observe(1.5, 2e-6);
        }
        assert_eq!(plateau.observe(1.5, 2e-6), Some(1e-6));
        // Already at the floor: nothing more to reduce.
        for _ in 0..2 {
            plateau.observe(1.5, 1e-6);
        }
        assert_eq!(plateau.observe(1.5, 1e-6), None);
    }

    #[test]
    fn improvement_resets_the_plateau_counter() {
        let mut plateau = ReduceLrOnPlateau::new();
        plateau.observe(1.0, 1e-3);
        plateau.observe(1.2, 1e-3);
        plateau.observe(1.2, 1e-3);
        plateau.observe(0.9, 1e-3);
        assert_eq!(plateau.observe(1.2, 1e-3), None);
    }

    #[test]
    fn early_stopping_restores_the_best_weights() {
        let mut net = tiny_net();
        let x = Tensor::from_vec(Shape::new(2, 2, 1), vec![0.3, -0.1, 0.7, 0.2]);
        let best_output = net.forward(&x, false);

        let mut early = EarlyStopping::new();
        early.patience = 2;
        assert!(!early.observe(1.0, &net).unwrap());

        // Weights drift while validation loss worsens.
        for p in net.params_mut() {
            for v in &mut p.value {
                *v += 0.5;
            }
        }
        assert!(!early.observe(1.5, &net).unwrap());
        assert!(early.observe(1.5, &net).unwrap());

        early.restore_best(&mut net).unwrap();
        assert_eq!(net.forward(&x, false).data, best_output.data);
    }
}
