use ndarray::{Array4, ArrayView4, Axis};

/// Pushes the per-sample L2 norm of a gradient towards one.
#[derive(Clone, Copy, Debug, Default)]
pub struct GradientPenalty;

impl GradientPenalty {
    pub fn new() -> Self {
        Self
    }

    fn norms(grad: ArrayView4<f32>) -> Vec<f32> {
        grad.axis_iter(Axis(0))
            .map(|g| g.iter().map(|v| v * v).sum::<f32>().sqrt())
            .collect()
    }

    /// The mean over the batch of `(||grad_i|| - 1)^2`.
    pub fn loss(&self, grad: ArrayView4<f32>) -> f32 {
        let norms = Self::norms(grad);
        if norms.is_empty() {
            return 0.0;
        }

        norms.iter().map(|n| (n - 1.0).powi(2)).sum::<f32>() / norms.len() as f32
    }

    /// The gradient of `loss` with respect to `grad`.
    pub fn loss_prime(&self, grad: ArrayView4<f32>) -> Array4<f32> {
        let norms = Self::norms(grad);
        let batch = norms.len().max(1) as f32;
        let mut d = grad.to_owned();

        for (mut sample, norm) in d.axis_iter_mut(Axis(0)).zip(norms) {
            let scale = if norm > 0.0 {
                2.0 * (norm - 1.0) / (norm * batch)
            } else {
                0.0
            };
            sample *= scale;
        }

        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_norm_gradients_cost_nothing() {
        let mut grad = Array4::zeros((2, 1, 2, 2));
        grad[[0, 0, 0, 0]] = 1.0;
        grad[[1, 0, 1, 1]] = -0.6;
        grad[[1, 0, 0, 1]] = 0.8;

        assert!(GradientPenalty.loss(grad.view()) < 1e-6);
        assert!(GradientPenalty.loss_prime(grad.view()).iter().all(|g| g.abs() < 1e-6));
    }

    #[test]
    fn penalizes_by_the_squared_distance_to_one() {
        let mut grad = Array4::zeros((2, 1, 1, 2));
        grad[[0, 0, 0, 0]] = 3.0;
        grad[[0, 0, 0, 1]] = 4.0;

        // Sample norms are 5 and 0: ((5 - 1)^2 + (0 - 1)^2) / 2
        assert_eq!(GradientPenalty.loss(grad.view()), 8.5);
    }
}
