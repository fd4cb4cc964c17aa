use log::info;
use machine_learning::arch::loss::{Criterion, GanKind, GanLoss, GradientPenalty, RangeLoss};

use crate::{
    configs::{Domain, Options},
    error::{Result, TrainErr},
};

/// A criterion together with the weight its value is scaled by in the total loss.
#[derive(Debug, Clone)]
pub struct Weighted<C> {
    pub criterion: C,
    pub weight: f32,
}

impl<C> Weighted<C> {
    pub fn new(criterion: C, weight: f32) -> Self {
        Self { criterion, weight }
    }
}

/// The gradient penalty term and the per-sample interpolation coefficients it is evaluated at.
#[derive(Debug, Clone)]
pub struct PenaltyTerm {
    pub penalty: Weighted<GradientPenalty>,
    /// One coefficient per sample, resized to the batch whenever it changes.
    pub alphas: Vec<f32>,
}

/// Every loss term of a training run. Absent terms are skipped everywhere, decided once here.
#[derive(Debug, Clone)]
pub struct LossBank {
    pub pixel: Option<Weighted<Criterion>>,
    pub pixel_domain: Domain,
    pub feature: Option<Weighted<Criterion>>,
    pub feature_domain: Domain,
    pub range: Option<Weighted<RangeLoss>>,
    pub gan: Weighted<GanLoss>,
    pub gradient_penalty: Option<PenaltyTerm>,
    pub relativistic: bool,
}

impl LossBank {
    /// Builds the loss terms out of the training options.
    ///
    /// # Errors
    /// `UnrecognizedCriterion` or `UnrecognizedGanType` for names that don't map to a criterion.
    pub fn new(options: &Options) -> Result<Self> {
        let train = &options.train;
        let keep_all = options.debug();

        let pixel = if train.pixel_weight > 0.0 || keep_all {
            let criterion = parse_criterion(&train.pixel_criterion)?;
            Some(Weighted::new(criterion, train.pixel_weight))
        } else {
            info!("Remove pixel loss.");
            None
        };

        let feature = if train.feature_weight > 0.0 || keep_all {
            let criterion = parse_criterion(&train.feature_criterion)?;
            Some(Weighted::new(criterion, train.feature_weight))
        } else {
            info!("Remove feature loss.");
            None
        };

        let range = if train.range_weight > 0.0 || keep_all {
            let [low, high] = options.range;
            Some(Weighted::new(RangeLoss::new(low, high), train.range_weight))
        } else {
            info!("Remove range loss.");
            None
        };

        let kind = GanKind::from_name(&train.gan_type)
            .ok_or_else(|| TrainErr::UnrecognizedGanType(train.gan_type.clone()))?;
        let gan = Weighted::new(GanLoss::new(kind), train.gan_weight);

        let gradient_penalty = (kind == GanKind::Wgan).then(|| PenaltyTerm {
            penalty: Weighted::new(GradientPenalty::new(), train.gp_weight),
            alphas: vec![0.0; 1],
        });

        Ok(Self {
            pixel,
            pixel_domain: train.pixel_domain,
            feature,
            feature_domain: train.feature_domain,
            range,
            gan,
            gradient_penalty,
            relativistic: options.network_d.relativistic,
        })
    }
}

fn parse_criterion(name: &str) -> Result<Criterion> {
    Criterion::from_name(name).ok_or_else(|| TrainErr::UnrecognizedCriterion(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(train: serde_json::Value, log: &str) -> Options {
        serde_json::from_value(serde_json::json!({
            "scale": 2,
            "path": { "models": "/tmp/models", "log": log },
            "network_g": { "in_nc": 1, "out_nc": 1, "nf": 2, "nb": 0 },
            "network_d": { "in_nc": 1, "nf": 2, "nb": 0 },
            "train": train,
        }))
        .unwrap()
    }

    #[test]
    fn zero_weights_disable_terms() {
        let bank = LossBank::new(&options(
            serde_json::json!({ "pixel_weight": 1.0, "pixel_criterion": "l2" }),
            "/tmp/log",
        ))
        .unwrap();

        assert_eq!(bank.pixel.as_ref().map(|p| p.criterion), Some(Criterion::L2));
        assert!(bank.feature.is_none());
        assert!(bank.range.is_none());
        assert!(bank.gradient_penalty.is_none());
        assert!(bank.relativistic);
    }

    #[test]
    fn debug_runs_keep_every_term() {
        let bank = LossBank::new(&options(serde_json::json!({}), "/tmp/debug/log")).unwrap();

        assert!(bank.pixel.is_some());
        assert!(bank.feature.is_some());
        assert!(bank.range.is_some());
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let err = LossBank::new(&options(
            serde_json::json!({ "pixel_weight": 1.0, "pixel_criterion": "huber" }),
            "/tmp/log",
        ))
        .unwrap_err();
        assert!(matches!(err, TrainErr::UnrecognizedCriterion(name) if name == "huber"));

        let err = LossBank::new(&options(
            serde_json::json!({ "gan_type": "hinge" }),
            "/tmp/log",
        ))
        .unwrap_err();
        assert!(matches!(err, TrainErr::UnrecognizedGanType(_)));
    }

    #[test]
    fn wgan_gp_adds_the_penalty() {
        let bank = LossBank::new(&options(
            serde_json::json!({ "gan_type": "wgan-gp", "gp_weight": 5.0 }),
            "/tmp/log",
        ))
        .unwrap();

        let gp = bank.gradient_penalty.unwrap();
        assert_eq!(gp.penalty.weight, 5.0);
        assert_eq!(bank.gan.criterion.kind(), GanKind::Wgan);
    }
}
