use serde::Deserialize;

use crate::error::{Result, TrainErr};

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorOptions {
    pub in_nc: usize,
    pub out_nc: usize,
    /// Hidden channels.
    pub nf: usize,
    /// Hidden blocks.
    pub nb: usize,
    /// Prepends a per-sample noise channel to the input.
    #[serde(default)]
    pub noise_input: bool,
    /// Border, in high resolution pixels, excluded from every loss.
    pub domain_crop: Option<usize>,
}

impl GeneratorOptions {
    pub(super) fn validate(&self) -> Result<()> {
        if self.in_nc == 0 || self.out_nc == 0 || self.nf == 0 {
            return Err(TrainErr::InvalidConfig(
                "generator channel counts must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscriminatorOptions {
    pub in_nc: usize,
    pub nf: usize,
    /// Each block halves the resolution.
    pub nb: usize,
    #[serde(default = "default_relativistic")]
    pub relativistic: bool,
}

fn default_relativistic() -> bool {
    true
}

impl DiscriminatorOptions {
    pub(super) fn validate(&self) -> Result<()> {
        if self.in_nc == 0 || self.nf == 0 {
            return Err(TrainErr::InvalidConfig(
                "discriminator channel counts must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// The frozen network the feature loss compares activations of.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureOptions {
    #[serde(default = "default_feature_nf")]
    pub nf: usize,
    #[serde(default = "default_feature_depth")]
    pub depth: usize,
}

fn default_feature_nf() -> usize {
    8
}

fn default_feature_depth() -> usize {
    2
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            nf: default_feature_nf(),
            depth: default_feature_depth(),
        }
    }
}

impl FeatureOptions {
    pub(super) fn validate(&self) -> Result<()> {
        if self.nf == 0 || self.depth == 0 {
            return Err(TrainErr::InvalidConfig(
                "the feature network needs at least one layer".into(),
            ));
        }
        Ok(())
    }
}
