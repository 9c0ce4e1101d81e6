use serde::{Deserialize, Serialize};

use crate::math::tensor::{Shape, Tensor};
use crate::nn::activation::Relu;
use crate::nn::conv::Conv2d;
use crate::nn::dense::Dense;
use crate::nn::dropout::Dropout;
use crate::nn::norm::BatchNorm;
use crate::nn::param::Param;
use crate::nn::pool::MaxPool2d;
use crate::nn::residual::ResidualBlock;

/// Collapses an H×W×C feature map into a 1×1×N vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flatten {
    #[serde(skip)]
    in_shape: Shape,
}

impl Flatten {
    pub fn new() -> Flatten {
        Flatten::default()
    }

    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        if training {
            self.in_shape = x.shape;
        }
        x.reshape(Shape::vector(x.len()))
    }

    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        grad_out.reshape(self.in_shape)
    }
}

/// One network layer. Enum dispatch keeps the whole architecture trivially
/// serializable as tagged JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Conv2d(Conv2d),
    BatchNorm(BatchNorm),
    Relu(Relu),
    MaxPool2d(MaxPool2d),
    Dropout(Dropout),
    Flatten(Flatten),
    Dense(Dense),
    Residual(ResidualBlock),
}

impl Layer {
    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        match self {
            Layer::Conv2d(l) => l.forward(x, training),
            Layer::BatchNorm(l) => l.forward(x, training),
            Layer::Relu(l) => l.forward(x, training),
            Layer::MaxPool2d(l) => l.forward(x, training),
            Layer::Dropout(l) => l.forward(x, training),
            Layer::Flatten(l) => l.forward(x, training),
            Layer::Dense(l) => l.forward(x, training),
            Layer::Residual(l) => l.forward(x, training),
        }
    }

    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        match self {
            Layer::Conv2d(l) => l.backward(grad_out),
            Layer::BatchNorm(l) => l.backward(grad_out),
            Layer::Relu(l) => l.backward(grad_out),
            Layer::MaxPool2d(l) => l.backward(grad_out),
            Layer::Dropout(l) => l.backward(grad_out),
            Layer::Flatten(l) => l.backward(grad_out),
            Layer::Dense(l) => l.backward(grad_out),
            Layer::Residual(l) => l.backward(grad_out),
        }
    }

    /// Learnable parameters, if any.
    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        match self {
            Layer::Conv2d(l) => l.params_mut(),
            Layer::BatchNorm(l) => l.params_mut(),
            Layer::Dense(l) => l.params_mut(),
            Layer::Residual(l) => l.params_mut(),
            Layer::Relu(_) | Layer::MaxPool2d(_) | Layer::Dropout(_) | Layer::Flatten(_) => {
                vec![]
            }
        }
    }
}
