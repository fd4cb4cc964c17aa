use ndarray::{Array1, Array4};
use rand::Rng;
use rand_distr::{Normal, Uniform};

use crate::error::Result;

/// One batch of training or validation data.
#[derive(Debug, Clone)]
pub struct Batch {
    /// The low resolution input, always present.
    pub lr: Array4<f32>,
    /// The high resolution target.
    pub hr: Option<Array4<f32>>,
    /// What the discriminator is shown as real, defaults to `hr`.
    pub reference: Option<Array4<f32>>,
    /// One noise scalar per sample for generators that take a noise channel.
    pub z: Option<Array1<f32>>,
}

impl Batch {
    pub fn new(lr: Array4<f32>) -> Self {
        Self {
            lr,
            hr: None,
            reference: None,
            z: None,
        }
    }

    pub fn with_hr(mut self, hr: Array4<f32>) -> Self {
        self.hr = Some(hr);
        self
    }

    pub fn with_reference(mut self, reference: Array4<f32>) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_z(mut self, z: Array1<f32>) -> Self {
        self.z = Some(z);
        self
    }

    pub fn len(&self) -> usize {
        self.lr.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a synthetic super-resolution pair: a smooth random high resolution image and its
    /// block-averaged low resolution version.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to sample from.
    /// * `(n, c)` - Samples and channels.
    /// * `lr_side` - The side of the square low resolution image.
    /// * `scale` - The high to low resolution ratio.
    pub fn synthetic<R: Rng>(
        rng: &mut R,
        (n, c): (usize, usize),
        lr_side: usize,
        scale: usize,
    ) -> Result<Self> {
        let hr_side = lr_side * scale;
        let phase = Uniform::new(0.0f32, std::f32::consts::TAU)?;
        let jitter = Normal::new(0.0f32, 0.02)?;

        let phases: Vec<(f32, f32)> = (0..n * c)
            .map(|_| (rng.sample(phase), rng.sample(phase)))
            .collect();

        let mut hr = Array4::from_shape_fn((n, c, hr_side, hr_side), |(b, ch, i, j)| {
            let (pi, pj) = phases[b * c + ch];
            let (y, x) = (i as f32 / hr_side as f32, j as f32 / hr_side as f32);
            0.5 + 0.25 * ((6.0 * y + pi).sin() + (6.0 * x + pj).cos()) / 2.0
        });
        hr.mapv_inplace(|v| (v + rng.sample(jitter)).clamp(0.0, 1.0));

        let area = (scale * scale) as f32;
        let lr = Array4::from_shape_fn((n, c, lr_side, lr_side), |(b, ch, i, j)| {
            let mut sum = 0.0;
            for di in 0..scale {
                for dj in 0..scale {
                    sum += hr[[b, ch, i * scale + di, j * scale + dj]];
                }
            }
            sum / area
        });

        Ok(Self::new(lr).with_hr(hr))
    }
}
