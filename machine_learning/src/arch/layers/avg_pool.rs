use ndarray::{Array4, ArrayView4, s};

use crate::{MlErr, Result};

/// Non-overlapping `k x k` average pooling. Trailing rows/columns that don't fill a window are
/// dropped.
#[derive(Clone, Debug)]
pub struct AvgPool {
    k: usize,
}

impl AvgPool {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn kernel(&self) -> usize {
        self.k
    }

    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let k = self.k;
        let (n, c, h, w) = x.dim();
        if k == 0 || h < k || w < k {
            return Err(MlErr::InvalidInput("pooling window larger than the input"));
        }

        let area = (k * k) as f32;
        let y = Array4::from_shape_fn((n, c, h / k, w / k), |(b, ch, i, j)| {
            x.slice(s![b, ch, i * k..(i + 1) * k, j * k..(j + 1) * k]).sum() / area
        });

        Ok(y)
    }

    pub fn backward(&self, x: ArrayView4<f32>, d: ArrayView4<f32>) -> Result<Array4<f32>> {
        let k = self.k;
        let area = (k * k) as f32;
        let (_, _, oh, ow) = d.dim();

        let dx = Array4::from_shape_fn(x.dim(), |(b, ch, i, j)| {
            let (oi, oj) = (i / k, j / k);
            if oi < oh && oj < ow {
                d[[b, ch, oi, oj]] / area
            } else {
                0.0
            }
        });

        Ok(dx)
    }
}
