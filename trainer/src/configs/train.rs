use serde::Deserialize;

/// Resolution a loss term is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Domain {
    #[default]
    #[serde(rename = "HR")]
    Hr,
    #[serde(rename = "LR")]
    Lr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub resume: bool,
    pub niter: usize,
    pub val_freq: usize,

    pub pixel_weight: f32,
    pub pixel_criterion: String,
    pub pixel_domain: Domain,
    pub feature_weight: f32,
    pub feature_criterion: String,
    pub feature_domain: Domain,
    pub range_weight: f32,
    pub gan_type: String,
    pub gan_weight: f32,
    pub gp_weight: f32,

    pub lr_g: f32,
    pub beta1_g: f32,
    pub weight_decay_g: f32,
    pub lr_d: f32,
    pub beta1_d: f32,
    pub weight_decay_d: f32,
    pub lr_scheme: String,
    pub lr_steps: Vec<usize>,
    pub lr_gamma: f32,

    pub grad_accumulation_steps_g: usize,
    pub grad_accumulation_steps_d: usize,

    /// A positive value fixes the G:D update cadence, anything else makes it adaptive.
    pub d_update_ratio: f64,
    /// Logical steps the discriminator trains on its own before the generator joins.
    ///
    /// Both gates are inclusive: with 5 the generator's first update is at logical step 5, not 6.
    /// A negative value instead holds the discriminator back until logical step `-d_init_iters`.
    pub d_init_iters: i64,
    /// Amount of logit gaps the adaptive policy looks back over.
    pub d_valid_steps_for_g_update: usize,
    pub min_d_prob_ratio_for_g: Option<f64>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            resume: false,
            niter: 1,
            val_freq: 0,
            pixel_weight: 0.0,
            pixel_criterion: "l1".into(),
            pixel_domain: Domain::Hr,
            feature_weight: 0.0,
            feature_criterion: "l1".into(),
            feature_domain: Domain::Hr,
            range_weight: 0.0,
            gan_type: "ragan".into(),
            gan_weight: 0.0,
            gp_weight: 10.0,
            lr_g: 1e-4,
            beta1_g: 0.9,
            weight_decay_g: 0.0,
            lr_d: 1e-4,
            beta1_d: 0.9,
            weight_decay_d: 0.0,
            lr_scheme: "MultiStepLR".into(),
            lr_steps: Vec::new(),
            lr_gamma: 0.5,
            grad_accumulation_steps_g: 1,
            grad_accumulation_steps_d: 1,
            d_update_ratio: 1.0,
            d_init_iters: 0,
            d_valid_steps_for_g_update: 0,
            min_d_prob_ratio_for_g: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerOptions {
    pub print_freq: usize,
    pub save_checkpoint_freq: usize,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            print_freq: 100,
            save_checkpoint_freq: 5000,
        }
    }
}
