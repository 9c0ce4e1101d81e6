use std::f64::consts::PI;
use std::fmt;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Height × width × channels dimensions of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub h: usize,
    pub w: usize,
    pub c: usize,
}

impl Shape {
    pub fn new(h: usize, w: usize, c: usize) -> Shape {
        Shape { h, w, c }
    }

    /// Shape of a flat feature vector of length `n`.
    pub fn vector(n: usize) -> Shape {
        Shape { h: 1, w: 1, c: n }
    }

    pub fn len(&self) -> usize {
        self.h * self.w * self.c
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::new(0, 0, 0)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.h, self.w, self.c)
    }
}

/// A dense row-major H×W×C array of f64 values.
///
/// All feature maps flowing through the network use this type; a flattened
/// feature vector is simply a 1×1×N tensor. Indexing is `(y * w + x) * c + ch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub shape: Shape,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(shape: Shape) -> Tensor {
        Tensor {
            shape,
            data: vec![0.0; shape.len()],
        }
    }

    pub fn from_vec(shape: Shape, data: Vec<f64>) -> Tensor {
        assert_eq!(
            shape.len(),
            data.len(),
            "data length {} does not match shape {}",
            data.len(),
            shape
        );
        Tensor { shape, data }
    }

    /// A 1×1×N tensor wrapping a flat feature vector.
    pub fn vector(data: Vec<f64>) -> Tensor {
        Tensor {
            shape: Shape::vector(data.len()),
            data,
        }
    }

    #[inline]
    pub fn idx(&self, y: usize, x: usize, ch: usize) -> usize {
        (y * self.shape.w + x) * self.shape.c + ch
    }

    #[inline]
    pub fn at(&self, y: usize, x: usize, ch: usize) -> f64 {
        self.data[(y * self.shape.w + x) * self.shape.c + ch]
    }

    #[inline]
    pub fn at_mut(&mut self, y: usize, x: usize, ch: usize) -> &mut f64 {
        &mut self.data[(y * self.shape.w + x) * self.shape.c + ch]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            shape: self.shape,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Reinterprets the buffer under a new shape of equal length.
    pub fn reshape(&self, shape: Shape) -> Tensor {
        assert_eq!(self.shape.len(), shape.len(), "reshape must preserve length");
        Tensor {
            shape,
            data: self.data.clone(),
        }
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor {
            shape: Shape::new(0, 0, 0),
            data: vec![],
        }
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
/// Both u1 and u2 must be uniform on (0, 1].
fn sample_standard_normal(rng: &mut ThreadRng) -> f64 {
    // Draw two independent uniform samples in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// He initialization: samples `n` values from N(0, sqrt(2 / fan_in)).
///
/// Recommended before ReLU layers. The variance 2/fan_in accounts for
/// the fact that ReLU zeroes half of its inputs on average.
pub fn he_init(n: usize, fan_in: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    let std_dev = (2.0 / fan_in as f64).sqrt();
    (0..n)
        .map(|_| sample_standard_normal(&mut rng) * std_dev)
        .collect()
}

/// Xavier (Glorot) initialization: samples `n` values from N(0, sqrt(1 / fan_in)).
///
/// Recommended before Softmax/Identity layers. Keeps the variance of
/// activations and gradients roughly equal across layers.
pub fn xavier_init(n: usize, fan_in: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    let std_dev = (1.0 / fan_in as f64).sqrt();
    (0..n)
        .map(|_| sample_standard_normal(&mut rng) * std_dev)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexing_is_row_major() {
        let mut t = Tensor::zeros(Shape::new(2, 3, 2));
        *t.at_mut(1, 2, 1) = 5.0;
        assert_eq!(t.data[(1 * 3 + 2) * 2 + 1], 5.0);
        assert_eq!(t.at(1, 2, 1), 5.0);
    }

    #[test]
    fn vector_shape_is_flat() {
        let t = Tensor::vector(vec![1.0, 2.0, 3.0]);
        assert_eq!(t.shape, Shape::new(1, 1, 3));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn reshape_preserves_data() {
        let t = Tensor::from_vec(Shape::new(2, 2, 1), vec![1.0, 2.0, 3.0, 4.0]);
        let r = t.reshape(Shape::vector(4));
        assert_eq!(r.data, t.data);
        assert_eq!(r.shape.len(), 4);
    }

    #[test]
    #[should_panic]
    fn reshape_rejects_length_change() {
        let t = Tensor::zeros(Shape::new(2, 2, 1));
        let _ = t.reshape(Shape::vector(5));
    }

    #[test]
    fn he_init_has_reasonable_spread() {
        let v = he_init(10_000, 50);
        let mean: f64 = v.iter().sum::<f64>() / v.len() as f64;
        let var: f64 = v.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / v.len() as f64;
        assert!(mean.abs() < 0.02);
        let expected = 2.0 / 50.0;
        assert!((var - expected).abs() < expected * 0.2);
    }
}
