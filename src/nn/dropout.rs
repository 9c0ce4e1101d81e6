use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::tensor::Tensor;

/// Inverted dropout: surviving activations are scaled by `1 / (1 - rate)` at
/// training time so evaluation is a plain identity pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    pub rate: f64,
    #[serde(skip)]
    mask: Vec<f64>,
}

impl Dropout {
    pub fn new(rate: f64) -> Dropout {
        assert!((0.0..1.0).contains(&rate), "dropout rate must be in [0, 1)");
        Dropout { rate, mask: vec![] }
    }

    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        if !training || self.rate == 0.0 {
            return x.clone();
        }
        let keep = 1.0 - self.rate;
        let scale = 1.0 / keep;
        let mut rng = rand::thread_rng();
        self.mask = x
            .data
            .iter()
            .map(|_| if rng.gen::<f64>() < keep { scale } else { 0.0 })
            .collect();
        Tensor {
            shape: x.shape,
            data: x
                .data
                .iter()
                .zip(self.mask.iter())
                .map(|(&v, &m)| v * m)
                .collect(),
        }
    }

    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        if self.mask.is_empty() {
            return grad_out.clone();
        }
        Tensor {
            shape: grad_out.shape,
            data: grad_out
                .data
                .iter()
                .zip(self.mask.iter())
                .map(|(&g, &m)| g * m)
                .collect(),
        }
    }
}
