use ndarray::{Array4, ArrayView4};

use crate::{MlErr, Result};

/// Nearest-neighbour spatial up-sampling by an integer factor.
#[derive(Clone, Debug)]
pub struct Upsample {
    scale: usize,
}

impl Upsample {
    pub fn new(scale: usize) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> usize {
        self.scale
    }

    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let s = self.scale;
        if s == 0 {
            return Err(MlErr::InvalidInput("up-sampling factor must be positive"));
        }

        let (n, c, h, w) = x.dim();
        let y = Array4::from_shape_fn((n, c, h * s, w * s), |(b, ch, i, j)| {
            x[[b, ch, i / s, j / s]]
        });

        Ok(y)
    }

    /// Every input pixel fans out to an `s x s` block, so its gradient is the block's sum.
    pub fn backward(&self, x: ArrayView4<f32>, d: ArrayView4<f32>) -> Result<Array4<f32>> {
        let s = self.scale;
        let mut dx = Array4::zeros(x.dim());

        for ((b, ch, i, j), &v) in d.indexed_iter() {
            if let Some(slot) = dx.get_mut([b, ch, i / s, j / s]) {
                *slot += v;
            }
        }

        Ok(dx)
    }
}
