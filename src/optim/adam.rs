use crate::nn::param::Param;

/// Adam optimizer with bias-corrected moment estimates.
///
/// The learning rate is public and mutable so the plateau policy can halve
/// it between epochs. Per-parameter moment buffers live in [`Param`]; the
/// optimizer only carries the shared hyperparameters and step counter.
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    t: u64,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
        }
    }

    /// Applies one update to every parameter from its accumulated gradient.
    /// Gradients are left untouched; callers zero them per batch.
    pub fn step(&mut self, params: Vec<&mut Param>) {
        self.t += 1;
        let bc1 = 1.0 - self.beta1.powi(self.t as i32);
        let bc2 = 1.0 - self.beta2.powi(self.t as i32);

        for p in params {
            for i in 0..p.value.len() {
                let g = p.grad[i];
                p.m[i] = self.beta1 * p.m[i] + (1.0 - self.beta1) * g;
                p.v[i] = self.beta2 * p.v[i] + (1.0 - self.beta2) * g * g;
                let m_hat = p.m[i] / bc1;
                let v_hat = p.v[i] / bc2;
                p.value[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.eps);
            }
        }
    }
}
