use serde::{Deserialize, Serialize};

use crate::math::tensor::{he_init, xavier_init, Shape, Tensor};
use crate::nn::activation::Activation;
use crate::nn::param::Param;

/// Fully connected layer over a flattened 1×1×N feature vector.
///
/// Weight layout is `[in][out]` flattened row-major (`i * out + o`). He
/// initialization before ReLU, Xavier otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub input_size: usize,
    pub size: usize,
    pub act: Activation,
    /// L2 kernel penalty coefficient; 0 disables regularization.
    pub l2: f64,
    pub weights: Param,
    pub biases: Param,
    #[serde(skip)]
    input: Tensor,
    #[serde(skip)]
    pre_act: Vec<f64>,
}

impl Dense {
    pub fn new(input_size: usize, size: usize, act: Activation) -> Dense {
        let n = input_size * size;
        let weights = match act {
            Activation::Relu => he_init(n, input_size),
            _ => xavier_init(n, input_size),
        };
        Dense {
            input_size,
            size,
            act,
            l2: 0.0,
            weights: Param::new(weights),
            biases: Param::zeros(size),
            input: Tensor::default(),
            pre_act: vec![],
        }
    }

    pub fn with_l2(mut self, l2: f64) -> Dense {
        self.l2 = l2;
        self
    }

    pub fn forward(&mut self, x: &Tensor, training: bool) -> Tensor {
        debug_assert_eq!(x.len(), self.input_size, "input size mismatch");
        let mut z = self.biases.value.clone();
        for (i, &xv) in x.data.iter().enumerate() {
            if xv == 0.0 {
                continue;
            }
            let row = &self.weights.value[i * self.size..(i + 1) * self.size];
            for (o, &w) in row.iter().enumerate() {
                z[o] += xv * w;
            }
        }

        let mut out = z.clone();
        self.act.apply(&mut out);
        if training {
            self.input = x.clone();
            self.pre_act = z;
        }
        Tensor::from_vec(Shape::vector(self.size), out)
    }

    pub fn backward(&mut self, grad_out: &Tensor) -> Tensor {
        // dL/dz = dL/da ⊙ act'(z); for Softmax the incoming delta is already
        // the combined softmax+cross-entropy gradient, so act'(z) = 1.
        let dz: Vec<f64> = grad_out
            .data
            .iter()
            .zip(self.pre_act.iter())
            .map(|(&g, &z)| g * self.act.derivative(z))
            .collect();

        for (o, &g) in dz.iter().enumerate() {
            self.biases.grad[o] += g;
        }

        let mut dx = vec![0.0; self.input_size];
        for (i, &xv) in self.input.data.iter().enumerate() {
            let row_w = &self.weights.value[i * self.size..(i + 1) * self.size];
            let row_g = &mut self.weights.grad[i * self.size..(i + 1) * self.size];
            let mut acc = 0.0;
            for (o, &g) in dz.iter().enumerate() {
                row_g[o] += xv * g;
                acc += row_w[o] * g;
            }
            dx[i] = acc;
        }

        if self.l2 > 0.0 {
            for (g, &w) in self.weights.grad.iter_mut().zip(self.weights.value.iter()) {
                *g += 2.0 * self.l2 * w;
            }
        }

        Tensor::from_vec(Shape::vector(self.input_size), dx)
    }

    pub fn params_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }
}
