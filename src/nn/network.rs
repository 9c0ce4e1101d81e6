use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::tensor::Tensor;
use crate::nn::layer::Layer;
use crate::nn::param::Param;

/// An ordered stack of layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    pub fn new(layers: Vec<Layer>) -> Network {
        Network { layers }
    }

    /// Forward pass. In training mode each layer caches what its backward
    /// pass needs; in eval mode dropout is disabled and batch-norm uses its
    /// running statistics.
    pub fn forward(&mut self, input: &Tensor, training: bool) -> Tensor {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current, training);
        }
        current
    }

    /// Backward pass from the output delta, accumulating parameter gradients.
    /// Returns the gradient w.r.t. the network input.
    pub fn backward(&mut self, output_delta: &Tensor) -> Tensor {
        let mut delta = output_delta.clone();
        for layer in self.layers.iter_mut().rev() {
            delta = layer.backward(&delta);
        }
        delta
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.params_mut())
            .collect()
    }

    pub fn zero_grads(&mut self) {
        for p in self.params_mut() {
            p.zero_grad();
        }
    }

    /// Scales all accumulated gradients, used to average over a mini-batch.
    pub fn scale_grads(&mut self, factor: f64) {
        for p in self.params_mut() {
            p.scale_grad(factor);
        }
    }

    /// Captures weights and running statistics as a JSON value. Used by early
    /// stopping to restore the best-seen epoch.
    pub fn snapshot(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn restore(&mut self, snapshot: serde_json::Value) -> Result<()> {
        *self = serde_json::from_value(snapshot)?;
        Ok(())
    }
}
