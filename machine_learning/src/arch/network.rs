use ndarray::{Array4, ArrayView4};

use crate::{Result, optimization::Optimizer};

/// A differentiable image-to-image network that owns its parameters and gradient buffer.
///
/// The gradient buffer is only ever added to by `backward`; clearing it is the caller's
/// responsibility, which lets several backward passes accumulate before an optimizer step.
pub trait Network {
    /// Returns the amount of parameters in the network.
    fn size(&self) -> usize;

    fn params(&self) -> &[f32];

    /// Replaces the network's parameters.
    ///
    /// # Errors
    /// Fails if `params` doesn't have exactly `size()` elements.
    fn load_params(&mut self, params: &[f32]) -> Result<()>;

    fn grad(&self) -> &[f32];

    fn zero_grad(&mut self);

    /// Computes the network's output for `x`.
    fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>>;

    /// Back-propagates `d`, the gradient with respect to the output for input `x`.
    /// If the network is trainable, the parameter gradient is **added** to the gradient buffer.
    ///
    /// # Returns
    /// The gradient with respect to `x`.
    fn backward(&mut self, x: ArrayView4<f32>, d: ArrayView4<f32>) -> Result<Array4<f32>>;

    /// Same as `backward` but never touches the gradient buffer.
    fn input_grad(&self, x: ArrayView4<f32>, d: ArrayView4<f32>) -> Result<Array4<f32>>;

    /// Applies one optimizer update using the accumulated gradient.
    fn optimize(&mut self, optimizer: &mut dyn Optimizer) -> Result<()>;

    /// Enables or disables accumulation of parameter gradients.
    fn set_trainable(&mut self, trainable: bool);

    fn trainable(&self) -> bool;

    /// Switches between training and evaluation mode.
    fn set_training(&mut self, training: bool);

    fn is_training(&self) -> bool;

    /// Returns the side, in input pixels, of the region one output pixel depends on.
    fn receptive_field(&self) -> usize;

    /// A human-readable, multi-line description of the architecture.
    fn describe(&self) -> String;
}
