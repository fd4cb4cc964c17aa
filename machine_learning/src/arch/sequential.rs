use std::mem;

use log::debug;
use ndarray::{Array4, ArrayView4};
use rand::Rng;
use rand_distr::Normal;

use super::{Network, layers::Layer};
use crate::{MlErr, Result, optimization::Optimizer};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// All parameters live in a single flat buffer, each layer owning a contiguous slice of it in
/// layer order. The gradient buffer mirrors that layout.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    params: Vec<f32>,
    grad: Vec<f32>,
    trainable: bool,
    training: bool,
}

impl Sequential {
    /// Creates a new `Sequential` with every parameter set to zero.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        let layers: Vec<Layer> = layers.into_iter().collect();
        let size = layers.iter().map(Layer::size).sum();

        Self {
            layers,
            params: vec![0.0; size],
            grad: vec![0.0; size],
            trainable: true,
            training: true,
        }
    }

    /// Initializes the weights of every pointwise layer with a Kaiming normal distribution and
    /// its biases with zeros.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to sample from.
    pub fn kaiming_init<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let mut offset = 0;

        for layer in &self.layers {
            let size = layer.size();

            if let Layer::Pointwise(l) = layer {
                let (fan_in, fan_out) = l.dim();
                let std_dev = (2.0 / fan_in as f32).sqrt();
                let normal = Normal::new(0.0, std_dev)
                    .map_err(|_| MlErr::InvalidInput("invalid initialization deviation"))?;

                let (weights, biases) =
                    self.params[offset..offset + size].split_at_mut(fan_in * fan_out);
                weights.iter_mut().for_each(|w| *w = rng.sample(normal));
                biases.fill(0.0);
            }

            offset += size;
        }

        debug!("kaiming-initialized {} parameters", self.params.len());
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Re-runs the forward pass keeping every layer's input, then walks the layers in reverse.
    fn backprop(
        &self,
        x: ArrayView4<f32>,
        d: ArrayView4<f32>,
        mut grad: Option<&mut [f32]>,
    ) -> Result<Array4<f32>> {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut out = x.to_owned();
        let mut offset = 0;

        for layer in &self.layers {
            let size = layer.size();
            let next = layer.forward(&self.params[offset..offset + size], out.view())?;
            inputs.push(out);
            out = next;
            offset += size;
        }

        if out.dim() != d.dim() {
            return Err(MlErr::SizeMismatch {
                what: "output gradient",
                got: d.len(),
                expected: out.len(),
            });
        }

        let mut delta = d.to_owned();
        let mut end = self.params.len();

        for (layer, input) in self.layers.iter().zip(&inputs).rev() {
            let start = end - layer.size();
            let layer_grad = grad.as_deref_mut().map(|g| &mut g[start..end]);
            delta = layer.backward(&self.params[start..end], layer_grad, input.view(), delta.view())?;
            end = start;
        }

        Ok(delta)
    }
}

impl Network for Sequential {
    fn size(&self) -> usize {
        self.params.len()
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn load_params(&mut self, params: &[f32]) -> Result<()> {
        if params.len() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                what: "loaded parameters",
                got: params.len(),
                expected: self.params.len(),
            });
        }

        self.params.copy_from_slice(params);
        Ok(())
    }

    fn grad(&self) -> &[f32] {
        &self.grad
    }

    fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut out = x.to_owned();
        let mut offset = 0;

        for layer in &self.layers {
            let size = layer.size();
            out = layer.forward(&self.params[offset..offset + size], out.view())?;
            offset += size;
        }

        Ok(out)
    }

    fn backward(&mut self, x: ArrayView4<f32>, d: ArrayView4<f32>) -> Result<Array4<f32>> {
        if !self.trainable {
            return self.backprop(x, d, None);
        }

        // Move the buffer out so `backprop` can borrow `self` immutably, no copy involved.
        let mut grad = mem::take(&mut self.grad);
        let ret = self.backprop(x, d, Some(&mut grad));
        self.grad = grad;
        ret
    }

    fn input_grad(&self, x: ArrayView4<f32>, d: ArrayView4<f32>) -> Result<Array4<f32>> {
        self.backprop(x, d, None)
    }

    fn optimize(&mut self, optimizer: &mut dyn Optimizer) -> Result<()> {
        optimizer.update_params(&self.grad, &mut self.params)
    }

    fn set_trainable(&mut self, trainable: bool) {
        self.trainable = trainable;
    }

    fn trainable(&self) -> bool {
        self.trainable
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn is_training(&self) -> bool {
        self.training
    }

    fn receptive_field(&self) -> usize {
        let mut field = 1.0;
        let mut jump = 1.0;

        for layer in &self.layers {
            match layer {
                Layer::AvgPool(l) => {
                    let k = l.kernel() as f64;
                    field += (k - 1.0) * jump;
                    jump *= k;
                }
                Layer::Upsample(l) => jump /= l.scale() as f64,
                Layer::Pointwise(_) | Layer::Activation(_) => {}
            }
        }

        field.ceil() as usize
    }

    fn describe(&self) -> String {
        let body: Vec<String> = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, layer)| format!("  ({i}): {}", layer.describe()))
            .collect();

        format!("Sequential(\n{}\n)", body.join("\n"))
    }
}
