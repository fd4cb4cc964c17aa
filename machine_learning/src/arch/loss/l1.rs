use ndarray::{Array, ArrayView, Dimension};

use super::LossFn;

/// Mean absolute error loss function.
#[derive(Default, Clone, Copy, Debug)]
pub struct L1;

impl L1 {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for L1 {
    fn loss<D: Dimension>(&self, y_pred: ArrayView<f32, D>, y: ArrayView<f32, D>) -> f32 {
        (&y_pred - &y).mapv(f32::abs).mean().unwrap_or_default()
    }

    fn loss_prime<D: Dimension>(
        &self,
        y_pred: ArrayView<f32, D>,
        y: ArrayView<f32, D>,
    ) -> Array<f32, D> {
        let n = y_pred.len() as f32;

        // The subgradient at zero is taken to be zero.
        (&y_pred - &y).mapv(|x| if x == 0.0 { 0.0 } else { x.signum() / n })
    }
}
