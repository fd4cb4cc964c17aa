use crate::Result;

pub trait Optimizer {
    /// Takes one step over `params` following `grad`.
    ///
    /// # Errors
    /// Fails if `grad` and `params` differ in length.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, learning_rate: f32);
}
