use serde::{Deserialize, Serialize};

use crate::math::tensor::Tensor;
use crate::nn::param::Param;

/// Per-channel batch normalization with running statistics.
///
/// The training loop feeds samples one at a time, so normalization
/// statistics are computed over the spatial positions of the current sample
/// (and folded into the running estimates used at inference). When a channel
/// has a single spatial position — i.e. the layer follows a dense feature
/// vector — sample statistics degenerate, so the running estimates are used
/// for normalization instead and treated as constants in the backward pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNorm {
    pub channels: usize,
    pub momentum: f64,
    pub eps: f64,
    /// Learnable scale, one per channel.
    pub gamma: Param,
    /// Learnable shift, one per channel.
    pub beta: Param,
    pub running_mean: Vec<f64>,
    pub running_var: Vec<f64>,
    #[serde(skip)]
    input: Tensor,
    #[serde(skip)]
    normalized: Tensor,
    #[serde(skip)]
    batch_mean: Vec<f64>,
    #[serde(skip)]
    batch_var: Vec<f64>,
    #[serde(skip)]
    used_sample_stats: bool,
}

impl BatchNorm {
    pub fn new(channels: usize) -> BatchNorm {
        BatchNorm {
            channels,
            momentum: 0.99,
            eps: 1e-3,
            gamma: Param::new(vec![1.0; channels]),
            beta: Param::zeros(channels),
            running_mean: vec![0.0; channels],
            running_var: vec![1.0; channels],
            input: Tensor::default(),
            normalized: Tensor::default(),
            batch_mean: vec![],
            batch_var: vec![],
            used_sample_stats: false,
        }
    }

    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        debug_assert_eq!(x.shape.c, self.channels, "channel count mismatch");
        let spatial = x.shape.h * x.shape.w;

        if !training {
            let (mean, var) = (self.running_mean.clone(), self.running_var.clone());
            return self.normalize_with(x, &mean, &var);
        }

        // Per-channel statistics over the sample's spatial positions.
        let mut mean = vec![0.0; self.channels];
        let mut var = vec![0.0; self.channels];
        for (i, &v) in x.data.iter().enumerate() {
            mean[i % self.channels] += v;
        }
        for m in &mut mean {
            *m /= spatial as f64;
        }
        for (i, &v) in x.data.iter().enumerate() {
            let d = v - mean[i % self.channels];
            var[i % self.channels] += d * d;
        }
        for v in &mut var {
            *v /= spatial as f64;
        }

        // Fold into running estimates.
        for c in 0..self.channels {
            self.running_mean[c] =
                self.momentum * self.running_mean[c] + (1.0 - self.momentum) * mean[c];
            self.running_var[c] =
                self.momentum * self.running_var[c] + (1.0 - self.momentum) * var[c];
        }

        self.used_sample_stats = spatial > 1;
        let (norm_mean, norm_var) = if self.used_sample_stats {
            (mean.clone(), var.clone())
        } else {
            (self.running_mean.clone(), self.running_var.clone())
        };

        let out = self.normalize_with(x, &norm_mean, &norm_var);
        self.input = x.clone();
        self.batch_mean = norm_mean;
        self.batch_var = norm_var;
        self.normalized = Tensor {
            shape: x.shape,
            data: x
                .data
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let c = i % self.channels;
                    (v - self.batch_mean[c]) / (self.batch_var[c] + self.eps).sqrt()
                })
                .collect(),
        };
        out
    }

    fn normalize_with(&self, x: &Tensor, mean: &[f64], var: &[f64]) -> Tensor {
        Tensor {
            shape: x.shape,
            data: x
                .data
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let c = i % self.channels;
                    let xhat = (v - mean[c]) / (var[c] + self.eps).sqrt();
                    self.gamma.value[c] * xhat + self.beta.value[c]
                })
                .collect(),
        }
    }

    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        let spatial = (self.input.shape.h * self.input.shape.w) as f64;
        let c_count = self.channels;

        // dgamma, dbeta.
        for (i, &g) in grad_out.data.iter().enumerate() {
            let c = i % c_count;
            self.beta.grad[c] += g;
            self.gamma.grad[c] += g * self.normalized.data[i];
        }

        if !self.used_sample_stats {
            // Statistics were constants; only the affine transform carries
            // gradient back to the input.
            return Tensor {
                shape: grad_out.shape,
                data: grad_out
                    .data
                    .iter()
                    .enumerate()
                    .map(|(i, &g)| {
                        let c = i % c_count;
                        g * self.gamma.value[c] / (self.batch_var[c] + self.eps).sqrt()
                    })
                    .collect(),
            };
        }

        // Full gradient through the sample statistics:
        // dx = (gamma / (N * sqrt(var + eps))) * (N*dxhat - sum(dxhat) - xhat * sum(dxhat * xhat))
        let mut sum_dxhat = vec![0.0; c_count];
        let mut sum_dxhat_xhat = vec![0.0; c_count];
        for (i, &g) in grad_out.data.iter().enumerate() {
            let c = i % c_count;
            let dxhat = g * self.gamma.value[c];
            sum_dxhat[c] += dxhat;
            sum_dxhat_xhat[c] += dxhat * self.normalized.data[i];
        }

        Tensor {
            shape: grad_out.shape,
            data: grad_out
                .data
                .iter()
                .enumerate()
                .map(|(i, &g)| {
                    let c = i % c_count;
                    let dxhat = g * self.gamma.value[c];
                    let inv_std = 1.0 / (self.batch_var[c] + self.eps).sqrt();
                    (inv_std / spatial)
                        * (spatial * dxhat
                            - sum_dxhat[c]
                            - self.normalized.data[i] * sum_dxhat_xhat[c])
                })
                .collect(),
        }
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.gamma, &mut self.beta]
    }
}
