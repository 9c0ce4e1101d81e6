use std::fmt;

use serde::{Deserialize, Serialize};

use crate::labels::Emotion;
use crate::math::tensor::Shape;
use crate::nn::activation::{Activation, Relu};
use crate::nn::conv::{Conv2d, Padding};
use crate::nn::dense::Dense;
use crate::nn::dropout::Dropout;
use crate::nn::layer::{Flatten, Layer};
use crate::nn::norm::BatchNorm;
use crate::nn::network::Network;
use crate::nn::pool::MaxPool2d;
use crate::nn::residual::ResidualBlock;

/// Expected network input: a 48×48 single-channel crop.
pub const INPUT_SHAPE: Shape = Shape { h: 48, w: 48, c: 1 };

/// L2 kernel penalty used by the deep residual variant.
const DEEP_L2: f64 = 1e-4;

/// Which architecture a model artifact was built from. The tag is persisted
/// in the artifact so a loaded model is never guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Three conv + batch-norm + pool + dropout blocks and a dense head.
    Baseline,
    /// Conv stem plus two residual stages.
    Residual,
    /// Three residual stages with L2 kernel regularization.
    ResidualDeep,
}

impl ModelVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelVariant::Baseline => "baseline",
            ModelVariant::Residual => "residual",
            ModelVariant::ResidualDeep => "residual_deep",
        }
    }

    /// Builds a freshly initialized network for this variant. The
    /// architecture is fully determined by the variant; there is no
    /// data-dependent branching.
    pub fn build(&self) -> Network {
        match self {
            ModelVariant::Baseline => baseline_cnn(),
            ModelVariant::Residual => residual_cnn(),
            ModelVariant::ResidualDeep => residual_cnn_deep(),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the activation shape while stacking layers, so dense input sizes
/// are derived instead of hand-computed.
struct Stack {
    layers: Vec<Layer>,
    shape: Shape,
}

impl Stack {
    fn new(input: Shape) -> Stack {
        Stack {
            layers: vec![],
            shape: input,
        }
    }

    fn conv(mut self, conv: Conv2d) -> Stack {
        self.shape = conv.out_shape(self.shape);
        self.layers.push(Layer::Conv2d(conv));
        self
    }

    fn batch_norm(mut self) -> Stack {
        self.layers.push(Layer::BatchNorm(BatchNorm::new(self.shape.c)));
        self
    }

    fn relu(mut self) -> Stack {
        self.layers.push(Layer::Relu(Relu::new()));
        self
    }

    fn max_pool(mut self) -> Stack {
        let pool = MaxPool2d::new(2);
        self.shape = pool.out_shape(self.shape);
        self.layers.push(Layer::MaxPool2d(pool));
        self
    }

    fn dropout(mut self, rate: f64) -> Stack {
        self.layers.push(Layer::Dropout(Dropout::new(rate)));
        self
    }

    fn residual(mut self, block: ResidualBlock) -> Stack {
        self.shape = block.out_shape(self.shape);
        self.layers.push(Layer::Residual(block));
        self
    }

    fn flatten(mut self) -> Stack {
        self.shape = Shape::vector(self.shape.len());
        self.layers.push(Layer::Flatten(Flatten::new()));
        self
    }

    fn dense(mut self, size: usize, act: Activation, l2: f64) -> Stack {
        let dense = Dense::new(self.shape.len(), size, act).with_l2(l2);
        self.shape = Shape::vector(size);
        self.layers.push(Layer::Dense(dense));
        self
    }

    fn finish(self) -> Network {
        Network::new(self.layers)
    }
}

/// Plain stack of three conv + batch-norm + pool + dropout blocks (valid
/// padding, 32/64/128 filters) feeding a 512-unit dense classifier.
pub fn baseline_cnn() -> Network {
    let mut stack = Stack::new(INPUT_SHAPE);
    for (in_ch, filters) in [(1, 32), (32, 64), (64, 128)] {
        stack = stack
            .conv(Conv2d::new(in_ch, filters, 3, 1, Padding::Valid, Activation::Relu))
            .batch_norm()
            .max_pool()
            .dropout(0.25);
    }
    stack
        .flatten()
        .dense(512, Activation::Relu, 0.0)
        .batch_norm()
        .dropout(0.5)
        .dense(Emotion::COUNT, Activation::Softmax, 0.0)
        .finish()
}

/// Residual variant: a conv stem followed by 64- and 128-filter residual
/// stages, each down-sampled by max pooling, and a 256-unit dense head.
pub fn residual_cnn() -> Network {
    Stack::new(INPUT_SHAPE)
        .conv(Conv2d::new(1, 32, 3, 1, Padding::Same, Activation::Identity))
        .batch_norm()
        .relu()
        .max_pool()
        .dropout(0.3)
        .residual(ResidualBlock::new(32, 64, 0.3))
        .max_pool()
        .residual(ResidualBlock::new(64, 128, 0.3))
        .max_pool()
        .flatten()
        .dense(256, Activation::Relu, 0.0)
        .batch_norm()
        .dropout(0.5)
        .dense(Emotion::COUNT, Activation::Softmax, 0.0)
        .finish()
}

/// Deeper residual variant: adds a 256-filter third stage and L2 weight
/// regularization on convolutional and dense kernels.
pub fn residual_cnn_deep() -> Network {
    Stack::new(INPUT_SHAPE)
        .conv(
            Conv2d::new(1, 32, 3, 1, Padding::Same, Activation::Identity).with_l2(DEEP_L2),
        )
        .batch_norm()
        .relu()
        .max_pool()
        .dropout(0.3)
        .residual(ResidualBlock::new(32, 64, 0.3).with_l2(DEEP_L2))
        .max_pool()
        .residual(ResidualBlock::new(64, 128, 0.3).with_l2(DEEP_L2))
        .max_pool()
        .residual(ResidualBlock::new(128, 256, 0.3).with_l2(DEEP_L2))
        .max_pool()
        .flatten()
        .dense(256, Activation::Relu, DEEP_L2)
        .batch_norm()
        .dropout(0.5)
        .dense(Emotion::COUNT, Activation::Softmax, DEEP_L2)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Tensor;

    fn assert_seven_way_softmax(net: &mut Network) {
        let x = Tensor::zeros(INPUT_SHAPE);
        let y = net.forward(&x, false);
        assert_eq!(y.len(), Emotion::COUNT);
        assert!((y.data.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(y.data.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn baseline_ends_in_seven_way_softmax() {
        assert_seven_way_softmax(&mut baseline_cnn());
    }

    #[test]
    fn residual_ends_in_seven_way_softmax() {
        assert_seven_way_softmax(&mut residual_cnn());
    }

    #[test]
    fn deep_variant_ends_in_seven_way_softmax() {
        assert_seven_way_softmax(&mut residual_cnn_deep());
    }

    #[test]
    fn deep_variant_carries_l2_on_kernels() {
        let net = residual_cnn_deep();
        let mut found = 0;
        for layer in &net.layers {
            match layer {
                Layer::Conv2d(c) => {
                    assert!(c.l2 > 0.0);
                    found += 1;
                }
                Layer::Dense(d) => {
                    assert!(d.l2 > 0.0);
                    found += 1;
                }
                Layer::Residual(r) => {
                    assert!(r.conv1.l2 > 0.0 && r.conv2.l2 > 0.0);
                    found += 1;
                }
                _ => {}
            }
        }
        assert!(found >= 6);
    }

    #[test]
    fn architectures_are_deterministic_in_shape() {
        // Two builds differ in random init but agree layer-for-layer.
        let a = residual_cnn();
        let b = residual_cnn();
        assert_eq!(a.layers.len(), b.layers.len());
    }
}
