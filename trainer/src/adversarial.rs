//! Adversarial objectives over raw discriminator outputs, together with their gradients with
//! respect to those outputs.
//!
//! In the relativistic form each side is scored by how far it sits from the mean of the other
//! side's predictions rather than against an absolute label.

use machine_learning::arch::{Network, loss::GanLoss};
use ndarray::{Array4, ArrayView4, Zip};

use crate::error::Result;

/// Largest input displacement used to differentiate the discriminator's parameter gradient along
/// a direction.
const PENALTY_STEP: f32 = 1e-3;

/// The discriminator's loss terms for one micro-step.
#[derive(Debug, Clone)]
pub struct DiscriminatorLoss {
    pub real: f32,
    pub fake: f32,
    /// `(real + fake) / 2`
    pub total: f32,
    pub grad_real: Array4<f32>,
    pub grad_fake: Array4<f32>,
}

fn mean(x: ArrayView4<f32>) -> f32 {
    x.mean().unwrap_or_default()
}

/// Scores the discriminator on real and fake predictions.
///
/// The standard form doubles each term so both forms share the same scale.
pub fn discriminator_loss(
    criterion: &GanLoss,
    relativistic: bool,
    pred_real: ArrayView4<f32>,
    pred_fake: ArrayView4<f32>,
) -> DiscriminatorLoss {
    if !relativistic {
        let real = 2.0 * criterion.loss(pred_real, true);
        let fake = 2.0 * criterion.loss(pred_fake, false);

        return DiscriminatorLoss {
            real,
            fake,
            total: (real + fake) / 2.0,
            grad_real: criterion.loss_prime(pred_real, true),
            grad_fake: criterion.loss_prime(pred_fake, false),
        };
    }

    let a = &pred_real - mean(pred_fake);
    let b = &pred_fake - mean(pred_real);

    let real = criterion.loss(a.view(), true);
    let fake = criterion.loss(b.view(), false);
    let ga = criterion.loss_prime(a.view(), true);
    let gb = criterion.loss_prime(b.view(), false);

    // Every element of `b` moves with the mean of the real predictions, and vice versa.
    let grad_real = (&ga - gb.sum() / pred_real.len() as f32) * 0.5;
    let grad_fake = (&gb - ga.sum() / pred_fake.len() as f32) * 0.5;

    DiscriminatorLoss {
        real,
        fake,
        total: (real + fake) / 2.0,
        grad_real,
        grad_fake,
    }
}

/// Scores the generator against a frozen discriminator, scaled by `weight`.
///
/// # Returns
/// The weighted loss and its gradient with respect to `pred_fake`. The real predictions are
/// treated as constants.
pub fn generator_loss(
    criterion: &GanLoss,
    relativistic: bool,
    weight: f32,
    pred_real: ArrayView4<f32>,
    pred_fake: ArrayView4<f32>,
) -> (f32, Array4<f32>) {
    if !relativistic {
        let loss = weight * criterion.loss(pred_fake, true);
        let grad = criterion.loss_prime(pred_fake, true) * weight;
        return (loss, grad);
    }

    let a = &pred_real - mean(pred_fake);
    let b = &pred_fake - mean(pred_real);

    let loss = weight * (criterion.loss(a.view(), false) + criterion.loss(b.view(), true)) / 2.0;
    let ga = criterion.loss_prime(a.view(), false);
    let gb = criterion.loss_prime(b.view(), true);
    let grad = (&gb - ga.sum() / pred_fake.len() as f32) * (weight / 2.0);

    (loss, grad)
}

/// Accumulates into `critic`'s parameter gradient the gradient of `scale * (grad_x . v)`, where
/// `grad_x` is the gradient of the summed critic output with respect to its input at `x`.
///
/// That equals the derivative of the summed output's parameter gradient along `v`, taken here
/// as a central difference over two backward passes. Networks built from piecewise linear layers
/// make the difference exact away from activation kinks.
///
/// # Arguments
/// * `critic` - The discriminator, trainable.
/// * `x` - The point the input gradient was taken at.
/// * `v` - The gradient of the penalty with respect to that input gradient.
/// * `scale` - The penalty weight.
pub fn penalty_backward(
    critic: &mut dyn Network,
    x: ArrayView4<f32>,
    v: ArrayView4<f32>,
    scale: f32,
) -> Result<()> {
    let largest = v.iter().fold(0.0f32, |m, a| m.max(a.abs()));
    if largest == 0.0 || scale == 0.0 {
        return Ok(());
    }

    let eps = PENALTY_STEP / largest;
    let shifted = |sign: f32| {
        let mut out = x.to_owned();
        Zip::from(&mut out).and(&v).for_each(|o, &d| *o += sign * eps * d);
        out
    };
    let (plus, minus) = (shifted(1.0), shifted(-1.0));

    let out_dim = critic.forward(plus.view())?.dim();
    let weight = Array4::from_elem(out_dim, scale / (2.0 * eps));
    critic.backward(plus.view(), weight.view())?;
    critic.backward(minus.view(), (-weight).view())?;

    Ok(())
}
