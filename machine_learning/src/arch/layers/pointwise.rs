use ndarray::{linalg, prelude::*};

use crate::{
    MlErr, Result,
    tensor::{from_rows, to_rows},
};

/// A fully connected layer applied independently to every pixel, that is, a 1x1 convolution.
///
/// Parameters are laid out as a `(c_in, c_out)` row-major weight matrix followed by `c_out`
/// biases.
#[derive(Clone, Debug)]
pub struct Pointwise {
    dim: (usize, usize),
    size: usize,
}

impl Pointwise {
    /// Creates a new `Pointwise` layer.
    ///
    /// # Arguments
    /// * `dim` - The amount of input and output channels.
    pub fn new(dim: (usize, usize)) -> Self {
        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the input and output channels.
    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn forward(&self, params: &[f32], x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (n, c, h, w) = x.dim();
        if c != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "pointwise input channels",
                got: c,
                expected: self.dim.0,
            });
        }

        let (weights, biases) = self.view_params(params)?;
        let mut z = to_rows(x)?.dot(&weights);
        z += &biases;

        from_rows(z, (n, h, w))
    }

    /// Propagates `d` back through the layer.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `grad` - This layer's gradient slice, **accumulated into** when present.
    /// * `x` - The input the layer saw on the forward pass.
    /// * `d` - The gradient with respect to the layer's output.
    ///
    /// # Returns
    /// The gradient with respect to the layer's input.
    pub fn backward(
        &self,
        params: &[f32],
        grad: Option<&mut [f32]>,
        x: ArrayView4<f32>,
        d: ArrayView4<f32>,
    ) -> Result<Array4<f32>> {
        let (n, _, h, w) = x.dim();
        let d_rows = to_rows(d)?;

        if let Some(grad) = grad {
            let x_rows = to_rows(x)?;
            let (mut dw, mut db) = self.view_grad(grad)?;
            linalg::general_mat_mul(1.0, &x_rows.t(), &d_rows, 1.0, &mut dw);
            db += &d_rows.sum_axis(Axis(0));
        }

        let (weights, _) = self.view_params(params)?;
        let dx = d_rows.dot(&weights.t());

        from_rows(dx, (n, h, w))
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        self.check_len("pointwise gradient", grad.len())?;

        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        self.check_len("pointwise parameters", params.len())?;

        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])?;
        Ok((weights, biases))
    }

    fn check_len(&self, what: &'static str, len: usize) -> Result<()> {
        if len != self.size {
            return Err(MlErr::SizeMismatch {
                what,
                got: len,
                expected: self.size,
            });
        }

        Ok(())
    }
}
