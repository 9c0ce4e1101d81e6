use serde::{Deserialize, Serialize};

use crate::math::tensor::{he_init, xavier_init, Shape, Tensor};
use crate::nn::activation::Activation;
use crate::nn::param::Param;

/// Spatial padding mode for [`Conv2d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// No padding; output shrinks by `kernel - 1` per axis at stride 1.
    Valid,
    /// Zero padding chosen so the output covers `ceil(dim / stride)` positions.
    Same,
}

/// A 2-D convolution with an optional fused activation.
///
/// Weight layout is `[ky][kx][in_ch][out_ch]` flattened row-major, so the
/// flat index is `((ky * kernel + kx) * in_ch + ic) * out_ch + oc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub in_ch: usize,
    pub out_ch: usize,
    pub kernel: usize,
    pub stride: usize,
    pub padding: Padding,
    pub act: Activation,
    /// L2 kernel penalty coefficient; 0 disables regularization.
    pub l2: f64,
    pub weights: Param,
    pub biases: Param,
    #[serde(skip)]
    input: Tensor,
    #[serde(skip)]
    pre_act: Tensor,
}

impl Conv2d {
    pub fn new(
        in_ch: usize,
        out_ch: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        act: Activation,
    ) -> Conv2d {
        let n = kernel * kernel * in_ch * out_ch;
        let fan_in = kernel * kernel * in_ch;
        // He init before ReLU, Xavier otherwise.
        let weights = match act {
            Activation::Relu => he_init(n, fan_in),
            _ => xavier_init(n, fan_in),
        };
        Conv2d {
            in_ch,
            out_ch,
            kernel,
            stride,
            padding,
            act,
            l2: 0.0,
            weights: Param::new(weights),
            biases: Param::zeros(out_ch),
            input: Tensor::default(),
            pre_act: Tensor::default(),
        }
    }

    pub fn with_l2(mut self, l2: f64) -> Conv2d {
        self.l2 = l2;
        self
    }

    /// Output shape and top/left padding for a given input shape.
    fn geometry(&self, input: Shape) -> (Shape, usize, usize) {
        match self.padding {
            Padding::Valid => {
                let oh = (input.h - self.kernel) / self.stride + 1;
                let ow = (input.w - self.kernel) / self.stride + 1;
                (Shape::new(oh, ow, self.out_ch), 0, 0)
            }
            Padding::Same => {
                let oh = (input.h + self.stride - 1) / self.stride;
                let ow = (input.w + self.stride - 1) / self.stride;
                let pad_h_total =
                    ((oh - 1) * self.stride + self.kernel).saturating_sub(input.h);
                let pad_w_total =
                    ((ow - 1) * self.stride + self.kernel).saturating_sub(input.w);
                (Shape::new(oh, ow, self.out_ch), pad_h_total / 2, pad_w_total / 2)
            }
        }
    }

    pub fn out_shape(&self, input: Shape) -> Shape {
        self.geometry(input).0
    }

    #[inline]
    fn w_idx(&self, ky: usize, kx: usize, ic: usize, oc: usize) -> usize {
        ((ky * self.kernel + kx) * self.in_ch + ic) * self.out_ch + oc
    }

    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        debug_assert_eq!(x.shape.c, self.in_ch, "channel count mismatch");
        let (out_shape, pad_h, pad_w) = self.geometry(x.shape);
        let mut z = Tensor::zeros(out_shape);

        for oy in 0..out_shape.h {
            for ox in 0..out_shape.w {
                for oc in 0..self.out_ch {
                    let mut sum = self.biases.value[oc];
                    for ky in 0..self.kernel {
                        let iy = (oy * self.stride + ky) as isize - pad_h as isize;
                        if iy < 0 || iy >= x.shape.h as isize {
                            continue;
                        }
                        for kx in 0..self.kernel {
                            let ix = (ox * self.stride + kx) as isize - pad_w as isize;
                            if ix < 0 || ix >= x.shape.w as isize {
                                continue;
                            }
                            for ic in 0..self.in_ch {
                                sum += x.at(iy as usize, ix as usize, ic)
                                    * self.weights.value[self.w_idx(ky, kx, ic, oc)];
                            }
                        }
                    }
                    *z.at_mut(oy, ox, oc) = sum;
                }
            }
        }

        let mut out = z.clone();
        self.act.apply(&mut out.data);
        if training {
            self.input = x.clone();
            self.pre_act = z;
        }
        out
    }

    /// Accumulates weight/bias gradients and returns the gradient w.r.t. the
    /// input. `grad_out` is dL/da for this layer's output.
    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        let out_shape = grad_out.shape;
        let (_, pad_h, pad_w) = self.geometry(self.input.shape);

        // dL/dz = dL/da ⊙ act'(z)
        let mut dz = grad_out.clone();
        for (g, &z) in dz.data.iter_mut().zip(self.pre_act.data.iter()) {
            *g *= self.act.derivative(z);
        }

        let mut dx = Tensor::zeros(self.input.shape);
        for oy in 0..out_shape.h {
            for ox in 0..out_shape.w {
                for oc in 0..self.out_ch {
                    let g = dz.at(oy, ox, oc);
                    if g == 0.0 {
                        continue;
                    }
                    self.biases.grad[oc] += g;
                    for ky in 0..self.kernel {
                        let iy = (oy * self.stride + ky) as isize - pad_h as isize;
                        if iy < 0 || iy >= self.input.shape.h as isize {
                            continue;
                        }
                        for kx in 0..self.kernel {
                            let ix = (ox * self.stride + kx) as isize - pad_w as isize;
                            if ix < 0 || ix >= self.input.shape.w as isize {
                                continue;
                            }
                            for ic in 0..self.in_ch {
                                let wi = self.w_idx(ky, kx, ic, oc);
                                self.weights.grad[wi] +=
                                    self.input.at(iy as usize, ix as usize, ic) * g;
                                *dx.at_mut(iy as usize, ix as usize, ic) +=
                                    self.weights.value[wi] * g;
                            }
                        }
                    }
                }
            }
        }

        if self.l2 > 0.0 {
            for (g, &w) in self.weights.grad.iter_mut().zip(self.weights.value.iter()) {
                *g += 2.0 * self.l2 * w;
            }
        }

        dx
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_conv(padding: Padding) -> Conv2d {
        let mut conv = Conv2d::new(1, 1, 3, 1, padding, Activation::Identity);
        // All-ones kernel, zero bias: output = sum of the 3x3 neighborhood.
        conv.weights = Param::new(vec![1.0; 9]);
        conv.biases = Param::zeros(1);
        conv
    }

    #[test]
    fn valid_padding_shrinks_output() {
        let mut conv = fixed_conv(Padding::Valid);
        let x = Tensor::from_vec(Shape::new(4, 4, 1), vec![1.0; 16]);
        let y = conv.forward(&x, false);
        assert_eq!(y.shape, Shape::new(2, 2, 1));
        assert!(y.data.iter().all(|&v| v == 9.0));
    }

    #[test]
    fn same_padding_preserves_dims() {
        let mut conv = fixed_conv(Padding::Same);
        let x = Tensor::from_vec(Shape::new(4, 4, 1), vec![1.0; 16]);
        let y = conv.forward(&x, false);
        assert_eq!(y.shape, Shape::new(4, 4, 1));
        // Corner position sees a 2x2 valid neighborhood.
        assert_eq!(y.at(0, 0, 0), 4.0);
        // Center position sees the full 3x3 neighborhood.
        assert_eq!(y.at(1, 1, 0), 9.0);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let mut conv = Conv2d::new(1, 2, 3, 1, Padding::Same, Activation::Identity);
        let x = Tensor::from_vec(
            Shape::new(4, 4, 1),
            (0..16).map(|i| (i as f64) / 16.0 - 0.5).collect(),
        );

        // Scalar loss L = sum(output); dL/da is all ones.
        let y = conv.forward(&x, true);
        let ones = Tensor::from_vec(y.shape, vec![1.0; y.len()]);
        let dx = conv.backward(&ones);

        let base: f64 = y.data.iter().sum();
        let eps = 1e-5;

        // Check a handful of weight gradients numerically.
        for wi in [0usize, 5, 9, 17] {
            let analytic = conv.weights.grad[wi];
            conv.weights.value[wi] += eps;
            let bumped: f64 = conv.forward(&x, false).data.iter().sum();
            conv.weights.value[wi] -= eps;
            let numeric = (bumped - base) / eps;
            assert!(
                (analytic - numeric).abs() < 1e-6,
                "weight {}: analytic {} vs numeric {}",
                wi,
                analytic,
                numeric
            );
        }

        // Input gradient: perturb one pixel.
        let pi = 5;
        let mut x2 = x.clone();
        x2.data[pi] += eps;
        let bumped: f64 = conv.forward(&x2, false).data.iter().sum();
        let numeric = (bumped - base) / eps;
        assert!((dx.data[pi] - numeric).abs() < 1e-6);
    }

    #[test]
    fn l2_penalty_adds_to_weight_gradient() {
        let mut conv = fixed_conv(Padding::Valid).with_l2(0.01);
        let x = Tensor::from_vec(Shape::new(3, 3, 1), vec![0.0; 9]);
        let y = conv.forward(&x, true);
        let zeros = Tensor::from_vec(y.shape, vec![0.0; y.len()]);
        conv.backward(&zeros);
        // Zero data gradient, so only the penalty term 2 * l2 * w remains.
        assert!((conv.weights.grad[0] - 0.02).abs() < 1e-12);
    }
}
