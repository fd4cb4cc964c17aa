use ndarray::{Array4, ArrayView4, s};

use crate::error::{Result, TrainErr};

/// Restricts loss computation to the valid region of a generated image.
pub trait DomainWrap {
    /// Keeps the valid region of `x`.
    fn unpad(&self, x: ArrayView4<f32>) -> Result<Array4<f32>>;

    /// Maps a gradient over the valid region back onto a full image of spatial size `full`.
    fn unpad_backward(&self, d: ArrayView4<f32>, full: (usize, usize)) -> Result<Array4<f32>>;
}

/// Drops a fixed border of pixels on every side, whatever lies there gets no gradient.
#[derive(Debug, Clone, Copy)]
pub struct BorderCrop {
    margin: usize,
}

impl BorderCrop {
    pub fn new(margin: usize) -> Self {
        Self { margin }
    }
}

impl DomainWrap for BorderCrop {
    fn unpad(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (_, _, h, w) = x.dim();
        let m = self.margin;

        if 2 * m >= h || 2 * m >= w {
            return Err(TrainErr::InvalidConfig(format!(
                "a {m} pixel border crop leaves nothing of a {h}x{w} image"
            )));
        }

        Ok(x.slice(s![.., .., m..h - m, m..w - m]).to_owned())
    }

    fn unpad_backward(&self, d: ArrayView4<f32>, (h, w): (usize, usize)) -> Result<Array4<f32>> {
        let (n, c, dh, dw) = d.dim();
        let m = self.margin;

        if dh + 2 * m != h || dw + 2 * m != w {
            return Err(TrainErr::InvalidConfig(format!(
                "a {dh}x{dw} gradient doesn't come from cropping {m} pixels off {h}x{w}"
            )));
        }

        let mut full = Array4::zeros((n, c, h, w));
        full.slice_mut(s![.., .., m..h - m, m..w - m]).assign(&d);
        Ok(full)
    }
}
