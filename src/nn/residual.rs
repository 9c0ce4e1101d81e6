use serde::{Deserialize, Serialize};

use crate::math::tensor::{Shape, Tensor};
use crate::nn::activation::{Activation, Relu};
use crate::nn::conv::{Conv2d, Padding};
use crate::nn::dropout::Dropout;
use crate::nn::norm::BatchNorm;
use crate::nn::param::Param;

/// Projection path applied to the shortcut when the channel count changes:
/// a 1×1 convolution followed by batch-norm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcut {
    pub conv: Conv2d,
    pub bn: BatchNorm,
}

/// A residual unit: `dropout(relu(F(x) + shortcut(x)))` where
/// `F = bn2(conv2(relu(bn1(conv1(x)))))`, both convolutions 3×3 with same
/// padding. The shortcut is the identity unless the channel count changes,
/// in which case it is projected through a 1×1 conv + batch-norm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidualBlock {
    pub conv1: Conv2d,
    pub bn1: BatchNorm,
    pub relu1: Relu,
    pub conv2: Conv2d,
    pub bn2: BatchNorm,
    pub shortcut: Option<Shortcut>,
    pub dropout: Dropout,
    /// Pre-activation sum `F(x) + shortcut(x)`, cached for the final ReLU.
    #[serde(skip)]
    sum: Tensor,
}

impl ResidualBlock {
    pub fn new(in_ch: usize, filters: usize, dropout_rate: f64) -> ResidualBlock {
        let shortcut = if in_ch != filters {
            Some(Shortcut {
                conv: Conv2d::new(in_ch, filters, 1, 1, Padding::Same, Activation::Identity),
                bn: BatchNorm::new(filters),
            })
        } else {
            None
        };
        ResidualBlock {
            conv1: Conv2d::new(in_ch, filters, 3, 1, Padding::Same, Activation::Identity),
            bn1: BatchNorm::new(filters),
            relu1: Relu::new(),
            conv2: Conv2d::new(filters, filters, 3, 1, Padding::Same, Activation::Identity),
            bn2: BatchNorm::new(filters),
            shortcut,
            dropout: Dropout::new(dropout_rate),
            sum: Tensor::default(),
        }
    }

    /// Applies an L2 kernel penalty to both main-path convolutions (and the
    /// projection, when present).
    pub fn with_l2(mut self, l2: f64) -> ResidualBlock {
        self.conv1.l2 = l2;
        self.conv2.l2 = l2;
        if let Some(sc) = &mut self.shortcut {
            sc.conv.l2 = l2;
        }
        self
    }

    pub fn out_shape(&self, input: Shape) -> Shape {
        self.conv1.out_shape(input)
    }

    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        let mut f = self.conv1.forward(x, training);
        f = self.bn1.forward(&f, training);
        f = self.relu1.forward(&f, training);
        f = self.conv2.forward(&f, training);
        f = self.bn2.forward(&f, training);

        let s = match &mut self.shortcut {
            Some(sc) => {
                let p = sc.conv.forward(x, training);
                sc.bn.forward(&p, training)
            }
            None => x.clone(),
        };

        debug_assert_eq!(f.shape, s.shape, "residual branches must agree in shape");
        let mut sum = f;
        for (v, &sv) in sum.data.iter_mut().zip(s.data.iter()) {
            *v += sv;
        }

        let mut out = sum.map(|v| if v > 0.0 { v } else { 0.0 });
        if training {
            self.sum = sum;
        }
        out = self.dropout.forward(&out, training);
        out
    }

    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        let g = self.dropout.backward(grad_out);

        // Final ReLU over the branch sum.
        let mut gsum = g;
        for (gv, &z) in gsum.data.iter_mut().zip(self.sum.data.iter()) {
            if z <= 0.0 {
                *gv = 0.0;
            }
        }

        // Main path, reversed.
        let mut gf = self.bn2.backward(&gsum);
        gf = self.conv2.backward(&gf);
        gf = self.relu1.backward(&gf);
        gf = self.bn1.backward(&gf);
        let gx_main = self.conv1.backward(&gf);

        // Shortcut path.
        let gx_short = match &mut self.shortcut {
            Some(sc) => {
                let gp = sc.bn.backward(&gsum);
                sc.conv.backward(&gp)
            }
            None => gsum,
        };

        let mut gx = gx_main;
        for (v, &sv) in gx.data.iter_mut().zip(gx_short.data.iter()) {
            *v += sv;
        }
        gx
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        let mut params = self.conv1.params_mut();
        params.extend(self.bn1.params_mut());
        params.extend(self.conv2.params_mut());
        params.extend(self.bn2.params_mut());
        if let Some(sc) = &mut self.shortcut {
            params.extend(sc.conv.params_mut());
            params.extend(sc.bn.params_mut());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_shortcut_when_channels_match() {
        let block = ResidualBlock::new(16, 16, 0.3);
        assert!(block.shortcut.is_none());
    }

    #[test]
    fn projected_shortcut_when_channels_change() {
        let block = ResidualBlock::new(32, 64, 0.3);
        let sc = block.shortcut.as_ref().expect("projection expected");
        assert_eq!(sc.conv.kernel, 1);
        assert_eq!(sc.conv.in_ch, 32);
        assert_eq!(sc.conv.out_ch, 64);
    }

    #[test]
    fn forward_preserves_spatial_dims() {
        let mut block = ResidualBlock::new(3, 8, 0.0);
        let x = Tensor::zeros(Shape::new(6, 6, 3));
        let y = block.forward(&x, false);
        assert_eq!(y.shape, Shape::new(6, 6, 8));
    }

    #[test]
    fn backward_returns_input_shaped_gradient() {
        let mut block = ResidualBlock::new(2, 4, 0.0);
        let x = Tensor::from_vec(
            Shape::new(4, 4, 2),
            (0..32).map(|i| (i as f64) / 32.0).collect(),
        );
        let y = block.forward(&x, true);
        let g = Tensor::from_vec(y.shape, vec![1.0; y.len()]);
        let dx = block.backward(&g);
        assert_eq!(dx.shape, x.shape);
        assert!(dx.data.iter().all(|v| v.is_finite()));
    }
}
