use ndarray::{Array, ArrayView, Dimension};

/// Penalizes values outside of `[low, high]` linearly, values inside cost nothing.
#[derive(Clone, Copy, Debug)]
pub struct RangeLoss {
    low: f32,
    high: f32,
}

impl RangeLoss {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    pub fn loss<D: Dimension>(&self, x: ArrayView<f32, D>) -> f32 {
        let (low, high) = (self.low, self.high);

        x.mapv(|v| (v - high).max(0.0) + (low - v).max(0.0))
            .mean()
            .unwrap_or_default()
    }

    pub fn loss_prime<D: Dimension>(&self, x: ArrayView<f32, D>) -> Array<f32, D> {
        let (low, high) = (self.low, self.high);
        let n = x.len() as f32;

        x.mapv(|v| {
            if v > high {
                1.0 / n
            } else if v < low {
                -1.0 / n
            } else {
                0.0
            }
        })
    }
}

impl Default for RangeLoss {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}
