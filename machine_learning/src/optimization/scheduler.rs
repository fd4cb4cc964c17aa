/// Multiplies the base learning rate by `gamma` each time the epoch counter reaches one of the
/// milestones.
#[derive(Clone, Debug)]
pub struct MultiStepLr {
    base_lr: f32,
    milestones: Vec<usize>,
    gamma: f32,
    epoch: usize,
}

impl MultiStepLr {
    pub fn new(base_lr: f32, mut milestones: Vec<usize>, gamma: f32) -> Self {
        milestones.sort_unstable();

        Self {
            base_lr,
            milestones,
            gamma,
            epoch: 0,
        }
    }

    /// Advances the counter by one.
    ///
    /// # Returns
    /// The learning rate for the new epoch.
    pub fn step(&mut self) -> f32 {
        self.epoch += 1;
        self.lr()
    }

    pub fn lr(&self) -> f32 {
        let passed = self.milestones.iter().filter(|&&m| m <= self.epoch).count();
        self.base_lr * self.gamma.powi(passed as i32)
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Moves the counter to `epoch` without stepping through the ones in between.
    pub fn set_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
    }
}
