use log::debug;

use crate::configs::TrainOptions;

/// Decides how often the discriminator and the generator update, relative to one another.
///
/// The ratio reads as "discriminator updates per generator update": above one the generator
/// only updates every `ratio` logical steps, below one the discriminator only updates every
/// `ceil(1 / ratio)` logical steps.
#[derive(Debug, Clone)]
pub struct DUpdatePolicy {
    configured: f64,
    lookback: usize,
    min_d_prob_ratio: Option<f64>,
    d_init_iters: i64,
    current: f64,
}

impl DUpdatePolicy {
    /// # Arguments
    /// * `configured` - A positive ratio is used as is, anything else makes the ratio adaptive.
    /// * `lookback` - Amount of logit gaps the adaptive ratio and the generator check look at.
    /// * `min_d_prob_ratio` - If set, the generator only updates while every one of the last
    ///   `lookback` logit gaps exceeds its logarithm.
    /// * `d_init_iters` - Logical steps the generator waits for the discriminator to warm up.
    pub fn new(
        configured: f64,
        lookback: usize,
        min_d_prob_ratio: Option<f64>,
        d_init_iters: i64,
    ) -> Self {
        let current = if configured > 0.0 { configured } else { 1.0 };

        Self {
            configured,
            lookback,
            min_d_prob_ratio,
            d_init_iters,
            current,
        }
    }

    pub fn from_options(train: &TrainOptions) -> Self {
        Self::new(
            train.d_update_ratio,
            train.d_valid_steps_for_g_update,
            train.min_d_prob_ratio_for_g,
            train.d_init_iters,
        )
    }

    pub fn ratio(&self) -> f64 {
        self.current
    }

    pub fn is_static(&self) -> bool {
        self.configured > 0.0
    }

    /// Recomputes the ratio from the logit gap history, called on a discriminator window's first
    /// micro-step.
    ///
    /// # Arguments
    /// * `history` - The `(gradient_step, logit_gap)` series, oldest first.
    pub fn recompute(&mut self, history: &[(usize, f64)]) -> f64 {
        self.current = if self.is_static() {
            self.configured
        } else if history.len() < self.lookback {
            self.lookback as f64
        } else {
            let recent = &history[history.len() - self.lookback..];
            let mean = recent.iter().map(|&(_, gap)| gap).sum::<f64>() / recent.len() as f64;
            adaptive_ratio(mean)
        };

        debug!(ratio = self.current; "discriminator update ratio");
        self.current
    }

    /// Whether the discriminator updates on `gradient_step`.
    pub fn d_fires(&self, gradient_step: usize) -> bool {
        let period = (1.0 / self.current).ceil().max(1.0);
        (gradient_step as f64) % period == 0.0 && gradient_step as i64 >= -self.d_init_iters
    }

    /// Whether the generator updates on `gradient_step`, given the logit gap history.
    ///
    /// The warm-up gate is inclusive, `d_init_iters = 5` lets the generator in at step 5.
    pub fn g_fires(&self, gradient_step: usize, history: &[(usize, f64)]) -> bool {
        let period = self.current.max(1.0);
        (gradient_step as f64) % period == 0.0
            && gradient_step as i64 >= self.d_init_iters
            && self.g_valid(history)
    }

    /// Whether the discriminator has been confident enough, for long enough, to train the
    /// generator against.
    pub fn g_valid(&self, history: &[(usize, f64)]) -> bool {
        let Some(min_ratio) = self.min_d_prob_ratio else {
            return true;
        };
        if self.lookback == 0 || history.len() < self.lookback {
            return true;
        }

        let threshold = min_ratio.ln();
        history[history.len() - self.lookback..]
            .iter()
            .all(|&(_, gap)| gap > threshold)
    }
}

/// Maps the mean logit gap of the lookback window to an update ratio.
///
/// At `ln(gap) < -2` the discriminator barely separates real from fake and trains
/// `-2 * ceil(ln(gap))` times per generator step. Past that point the discriminator slows down
/// linearly with `ln(gap)`, never below once every 50 generator steps. `ln(gap) == -2` falls in
/// the second branch.
pub fn adaptive_ratio(mean_gap: f64) -> f64 {
    ratio_from_log_gap(mean_gap.max(1e-5).ln())
}

fn ratio_from_log_gap(m: f64) -> f64 {
    if m < -2.0 {
        -2.0 * m.ceil()
    } else {
        ((100.0 * (m + 1.0)).floor() / -100.0).max(1.0 / 50.0)
    }
}
