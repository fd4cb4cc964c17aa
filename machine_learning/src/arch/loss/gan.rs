use ndarray::{Array, ArrayView, Dimension};

/// The adversarial objective the discriminator's raw outputs are scored with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GanKind {
    /// Binary cross entropy over logits.
    Vanilla,
    /// Least squares.
    Lsgan,
    /// Wasserstein, the critic's mean output signed by the target.
    Wgan,
}

impl GanKind {
    /// Parses a GAN type name. `"gan"` and `"ragan"` share the same criterion, the relativistic
    /// part lives in how the discriminator outputs are combined.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gan" | "ragan" => Some(Self::Vanilla),
            "lsgan" => Some(Self::Lsgan),
            "wgan-gp" => Some(Self::Wgan),
            _ => None,
        }
    }
}

/// A GAN criterion with fixed real and fake target labels.
#[derive(Clone, Copy, Debug)]
pub struct GanLoss {
    kind: GanKind,
    real_label: f32,
    fake_label: f32,
}

impl GanLoss {
    pub fn new(kind: GanKind) -> Self {
        Self {
            kind,
            real_label: 1.0,
            fake_label: 0.0,
        }
    }

    pub fn kind(&self) -> GanKind {
        self.kind
    }

    fn label(&self, target_is_real: bool) -> f32 {
        if target_is_real {
            self.real_label
        } else {
            self.fake_label
        }
    }

    /// Scores `pred` against every element being `target_is_real`.
    pub fn loss<D: Dimension>(&self, pred: ArrayView<f32, D>, target_is_real: bool) -> f32 {
        let t = self.label(target_is_real);

        match self.kind {
            // max(x, 0) - x * t + ln(1 + e^-|x|) never overflows.
            GanKind::Vanilla => pred
                .mapv(|x| x.max(0.0) - x * t + (-x.abs()).exp().ln_1p())
                .mean()
                .unwrap_or_default(),
            GanKind::Lsgan => pred.mapv(|x| (x - t).powi(2)).mean().unwrap_or_default(),
            GanKind::Wgan => {
                let mean = pred.mean().unwrap_or_default();
                if target_is_real { -mean } else { mean }
            }
        }
    }

    /// The gradient of `loss` with respect to `pred`.
    pub fn loss_prime<D: Dimension>(
        &self,
        pred: ArrayView<f32, D>,
        target_is_real: bool,
    ) -> Array<f32, D> {
        let t = self.label(target_is_real);
        let n = pred.len().max(1) as f32;

        match self.kind {
            GanKind::Vanilla => pred.mapv(|x| (sigmoid(x) - t) / n),
            GanKind::Lsgan => pred.mapv(|x| 2.0 * (x - t) / n),
            GanKind::Wgan => {
                let sign = if target_is_real { -1.0 } else { 1.0 };
                pred.mapv(|_| sign / n)
            }
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
