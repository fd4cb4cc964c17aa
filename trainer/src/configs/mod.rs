mod networks;
mod paths;
mod train;

use std::{fs, path::Path};

use serde::Deserialize;

pub use networks::{DiscriminatorOptions, FeatureOptions, GeneratorOptions};
pub use paths::PathOptions;
pub use train::{Domain, LoggerOptions, TrainOptions};

use crate::error::{Result, TrainErr};

/// Everything a run is configured with, usually read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct Options {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_true")]
    pub is_train: bool,
    /// Ratio between the high and low resolution sides.
    pub scale: usize,
    /// The valid range of image values, `[low, high]`.
    #[serde(default = "default_range")]
    pub range: [f32; 2],
    pub seed: Option<u64>,
    pub path: PathOptions,
    pub network_g: GeneratorOptions,
    pub network_d: DiscriminatorOptions,
    #[serde(default)]
    pub network_f: FeatureOptions,
    #[serde(default)]
    pub train: TrainOptions,
    #[serde(default)]
    pub logger: LoggerOptions,
}

fn default_name() -> String {
    "srragan".into()
}

fn default_true() -> bool {
    true
}

fn default_range() -> [f32; 2] {
    [0.0, 1.0]
}

impl Options {
    /// Reads and validates the options stored as JSON in `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let options: Self = serde_json::from_str(&raw)?;
        options.validate()?;
        Ok(options)
    }

    /// Whether the run is a debug run, which keeps every loss term alive regardless of its weight.
    pub fn debug(&self) -> bool {
        self.path.log.to_string_lossy().contains("debug")
    }

    /// Rejects configurations that can't be trained, before any network is built.
    pub fn validate(&self) -> Result<()> {
        if self.scale == 0 {
            return Err(TrainErr::InvalidConfig("scale must be positive".into()));
        }

        let [low, high] = self.range;
        if low >= high {
            return Err(TrainErr::InvalidConfig(format!(
                "range [{low}, {high}] is empty"
            )));
        }

        self.network_g.validate()?;
        if self.network_d.in_nc != self.network_g.out_nc {
            return Err(TrainErr::InvalidConfig(format!(
                "the discriminator takes {} channels but the generator outputs {}",
                self.network_d.in_nc, self.network_g.out_nc
            )));
        }
        self.network_d.validate()?;
        self.network_f.validate()?;

        if self.is_train {
            self.validate_training()?;
        }

        Ok(())
    }

    fn validate_training(&self) -> Result<()> {
        let train = &self.train;

        if self.logger.print_freq == 0 || self.logger.save_checkpoint_freq == 0 {
            return Err(TrainErr::InvalidConfig(
                "logger frequencies must be positive".into(),
            ));
        }

        let (wg, wd) = (
            train.grad_accumulation_steps_g,
            train.grad_accumulation_steps_d,
        );
        if wg == 0 || wd == 0 {
            return Err(TrainErr::InvalidConfig(
                "gradient accumulation windows must be at least 1".into(),
            ));
        }
        // Windows must nest so every logical step holds whole windows of both networks.
        if wg.max(wd) % wg.min(wd) != 0 {
            return Err(TrainErr::InvalidConfig(format!(
                "the larger accumulation window ({}) must be a multiple of the smaller ({})",
                wg.max(wd),
                wg.min(wd)
            )));
        }

        for (name, weight) in [
            ("pixel_weight", train.pixel_weight),
            ("feature_weight", train.feature_weight),
            ("range_weight", train.range_weight),
            ("gan_weight", train.gan_weight),
            ("gp_weight", train.gp_weight),
        ] {
            if !(weight >= 0.0) {
                return Err(TrainErr::InvalidConfig(format!(
                    "{name} must be non-negative, got {weight}"
                )));
            }
        }

        if train.d_update_ratio <= 0.0 && train.d_valid_steps_for_g_update == 0 {
            return Err(TrainErr::InvalidConfig(
                "an adaptive d_update_ratio needs d_valid_steps_for_g_update >= 1".into(),
            ));
        }

        if let Some(min_ratio) = train.min_d_prob_ratio_for_g {
            if !(min_ratio > 0.0) {
                return Err(TrainErr::InvalidConfig(format!(
                    "min_d_prob_ratio_for_g must be positive, got {min_ratio}"
                )));
            }
        }

        if train.pixel_domain == Domain::Lr && self.network_g.domain_crop.is_some() {
            return Err(TrainErr::InvalidConfig(
                "a low resolution pixel loss can't be combined with a domain crop".into(),
            ));
        }

        if train.lr_g <= 0.0 || train.lr_d <= 0.0 {
            return Err(TrainErr::InvalidConfig(
                "learning rates must be positive".into(),
            ));
        }

        if train.niter == 0 {
            return Err(TrainErr::InvalidConfig("niter must be positive".into()));
        }

        Ok(())
    }
}
