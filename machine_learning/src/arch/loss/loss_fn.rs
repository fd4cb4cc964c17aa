use ndarray::{Array, ArrayView, Dimension};

/// A differentiable distance between a prediction and its target, reduced by the mean.
pub trait LossFn {
    fn loss<D: Dimension>(&self, y_pred: ArrayView<f32, D>, y: ArrayView<f32, D>) -> f32;

    /// The gradient of `loss` with respect to `y_pred`.
    fn loss_prime<D: Dimension>(&self, y_pred: ArrayView<f32, D>, y: ArrayView<f32, D>)
    -> Array<f32, D>;
}
