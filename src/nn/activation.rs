use serde::{Deserialize, Serialize};

use crate::math::tensor::Tensor;

/// Activation applied after a layer's linear transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    Relu,
    /// Softmax is a vector-valued activation applied over the whole output at
    /// once. It is always paired with cross-entropy loss, whose combined
    /// gradient (`predicted - expected`) arrives pre-multiplied, so
    /// `derivative()` returns 1.0 to pass that delta through unchanged.
    Softmax,
}

impl Activation {
    /// Applies the activation to a full pre-activation vector in place.
    pub fn apply(&self, z: &mut [f64]) {
        match self {
            Activation::Identity => {}
            Activation::Relu => {
                for v in z.iter_mut() {
                    if *v < 0.0 {
                        *v = 0.0;
                    }
                }
            }
            Activation::Softmax => {
                // Shift by the max for numerical stability.
                let max = z.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let mut sum = 0.0;
                for v in z.iter_mut() {
                    *v = (*v - max).exp();
                    sum += *v;
                }
                if sum > 0.0 {
                    for v in z.iter_mut() {
                        *v /= sum;
                    }
                }
            }
        }
    }

    /// Element-wise derivative evaluated at pre-activation `z`.
    pub fn derivative(&self, z: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Softmax => 1.0,
        }
    }
}

/// Standalone ReLU layer used where the activation is not fused into a
/// convolution (e.g. after a batch-norm inside a residual block).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relu {
    #[serde(skip)]
    input: Tensor,
}

impl Relu {
    pub fn new() -> Relu {
        Relu::default()
    }

    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        if training {
            self.input = x.clone();
        }
        x.map(|v| if v > 0.0 { v } else { 0.0 })
    }

    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        let mut grad = grad_out.clone();
        for (g, &z) in grad.data.iter_mut().zip(self.input.data.iter()) {
            if z <= 0.0 {
                *g = 0.0;
            }
        }
        grad
    }
}
