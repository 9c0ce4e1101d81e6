use serde::{Deserialize, Serialize};

/// A learnable parameter buffer with its gradient accumulator and Adam
/// moment estimates.
///
/// Only the values are persisted; gradients and optimizer state are
/// per-process scratch, rebuilt (zeroed) when a model is loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "Vec<f64>")]
pub struct Param {
    pub value: Vec<f64>,
    pub grad: Vec<f64>,
    /// First-moment (mean) estimate, used by Adam.
    pub m: Vec<f64>,
    /// Second-moment (uncentered variance) estimate, used by Adam.
    pub v: Vec<f64>,
}

impl Param {
    pub fn new(value: Vec<f64>) -> Param {
        let n = value.len();
        Param {
            value,
            grad: vec![0.0; n],
            m: vec![0.0; n],
            v: vec![0.0; n],
        }
    }

    pub fn zeros(n: usize) -> Param {
        Param::new(vec![0.0; n])
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn zero_grad(&mut self) {
        for g in &mut self.grad {
            *g = 0.0;
        }
    }

    pub fn scale_grad(&mut self, factor: f64) {
        for g in &mut self.grad {
            *g *= factor;
        }
    }
}

impl From<Vec<f64>> for Param {
    fn from(value: Vec<f64>) -> Self {
        Param::new(value)
    }
}

impl From<Param> for Vec<f64> {
    fn from(p: Param) -> Self {
        p.value
    }
}
