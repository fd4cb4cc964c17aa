use ndarray::{Array, ArrayView, Dimension};

use super::LossFn;

/// Mean squared error loss function.
#[derive(Default, Clone, Copy, Debug)]
pub struct Mse;

impl Mse {
    /// Returns a new `Mse`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn loss<D: Dimension>(&self, y_pred: ArrayView<f32, D>, y: ArrayView<f32, D>) -> f32 {
        (&y_pred - &y)
            .mapv(|x| x.powi(2))
            .mean()
            .unwrap_or_default()
    }

    fn loss_prime<D: Dimension>(
        &self,
        y_pred: ArrayView<f32, D>,
        y: ArrayView<f32, D>,
    ) -> Array<f32, D> {
        (&y_pred - &y) * (2.0 / y_pred.len() as f32)
    }
}
