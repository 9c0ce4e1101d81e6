/// Categorical cross-entropy over the seven-way softmax output.
pub struct CrossEntropyLoss;

// Keeps ln() finite when a class probability underflows to zero.
const EPS: f64 = 1e-12;

impl CrossEntropyLoss {
    /// Scalar loss for one sample: `-Σ target[i] · ln(probs[i] + eps)`.
    /// `probs` is the softmax distribution, `target` the one-hot label.
    pub fn loss(probs: &[f64], target: &[f64]) -> f64 {
        probs
            .iter()
            .zip(target.iter())
            .map(|(p, t)| -t * (p + EPS).ln())
            .sum()
    }

    /// Initial delta for the backward pass, taken with respect to the
    /// pre-softmax logits: `probs[i] - target[i]`. The softmax layer's
    /// derivative is identity, so the combined gradient lands exactly once.
    pub fn derivative(probs: &[f64], target: &[f64]) -> Vec<f64> {
        probs
            .iter()
            .zip(target.iter())
            .map(|(p, t)| p - t)
            .collect()
    }
}
