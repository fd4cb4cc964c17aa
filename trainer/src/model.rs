use std::{collections::BTreeMap, num::NonZeroUsize, path::Path};

use log::{debug, info, warn};
use machine_learning::{
    arch::{Network, loss::LossFn},
    optimization::{Adam, MultiStepLr, Optimizer},
    resize::{bilinear, bilinear_backward},
};
use ndarray::{Array1, Array4, ArrayView4, Axis, s};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Normal, Uniform};

use crate::{
    adversarial,
    batch::Batch,
    checkpoint::{self, Checkpoints},
    configs::{Domain, Options},
    d_update::DUpdatePolicy,
    domain::{BorderCrop, DomainWrap},
    error::{Result, TrainErr},
    factory::NetworkFactory,
    losses::LossBank,
    metrics::{Flush, MetricsLog, WindowMeans},
    plot,
    report,
    schedule::{Accumulation, MicroStep, WindowState},
};

const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-8;
const SUPPORTED_LR_SCHEME: &str = "MultiStepLR";

/// What happened on one call to `optimize_parameters`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    pub gradient_step: usize,
    /// The discriminator accumulated gradients this micro-step.
    pub d_updated: bool,
    /// The generator accumulated gradients this micro-step.
    pub g_updated: bool,
    pub d_optimizer_stepped: bool,
    pub g_optimizer_stepped: bool,
}

/// Low resolution input, generated output and target of the last fed batch.
#[derive(Debug, Clone)]
pub struct Visuals {
    pub lr: Array4<f32>,
    pub sr: Array4<f32>,
    pub hr: Option<Array4<f32>>,
}

/// Everything that only exists while training.
struct Training {
    discriminator: Box<dyn Network>,
    feature: Option<Box<dyn Network>>,
    losses: LossBank,
    accumulation: Accumulation,
    policy: DUpdatePolicy,
    optimizer_g: Adam,
    optimizer_d: Adam,
    scheduler_g: MultiStepLr,
    scheduler_d: MultiStepLr,
    window_g: WindowState,
    window_d: WindowState,
    means_g: WindowMeans,
    means_d: WindowMeans,
}

/// The generator's side of one micro-step.
struct GeneratorInputs<'a> {
    input: ArrayView4<'a, f32>,
    fake: ArrayView4<'a, f32>,
    hr: ArrayView4<'a, f32>,
    reference: ArrayView4<'a, f32>,
    out_size: (usize, usize),
    lr_size: (usize, usize),
}

/// A relativistic GAN super-resolution model: a generator, and while training a discriminator,
/// an optional frozen feature network, their optimizers and the metrics log.
pub struct SrRaGanModel {
    options: Options,
    rng: StdRng,
    generator: Box<dyn Network>,
    domain: Option<Box<dyn DomainWrap>>,
    training: Option<Training>,
    checkpoints: Checkpoints,
    log: MetricsLog,
    start_iter: usize,

    lr: Option<Array4<f32>>,
    hr: Option<Array4<f32>>,
    reference: Option<Array4<f32>>,
    fake: Option<Array4<f32>>,
}

impl SrRaGanModel {
    /// Builds the model described by `options`, loading pretrained or resumed weights.
    ///
    /// # Errors
    /// Configuration errors are returned before any network is built.
    pub fn new<F: NetworkFactory>(options: Options, factory: &F) -> Result<Self> {
        options.validate()?;

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let generator = factory.generator(&options, &mut rng)?;
        if generator.size() == 0 {
            warn!("Params [generator] will not optimize.");
        }

        let training = if options.is_train {
            Some(Self::build_training(
                &options,
                factory,
                generator.size(),
                &mut rng,
            )?)
        } else {
            None
        };

        let domain = options
            .network_g
            .domain_crop
            .map(|margin| Box::new(BorderCrop::new(margin)) as Box<dyn DomainWrap>);

        let mut model = Self {
            checkpoints: Checkpoints::new(options.path.models.clone()),
            options,
            rng,
            generator,
            domain,
            training,
            log: MetricsLog::new(),
            start_iter: 0,
            lr: None,
            hr: None,
            reference: None,
            fake: None,
        };

        model.load()?;
        model.print_network()?;

        info!("---------- Model initialized ------------------");
        Ok(model)
    }

    fn build_training<F: NetworkFactory>(
        options: &Options,
        factory: &F,
        g_size: usize,
        rng: &mut StdRng,
    ) -> Result<Training> {
        let train = &options.train;

        let losses = LossBank::new(options)?;
        if train.lr_scheme != SUPPORTED_LR_SCHEME {
            return Err(TrainErr::UnsupportedLrScheme(train.lr_scheme.clone()));
        }

        let window = |len: usize| {
            NonZeroUsize::new(len).ok_or_else(|| {
                TrainErr::InvalidConfig("gradient accumulation windows must be at least 1".into())
            })
        };
        let accumulation = Accumulation::new(
            window(train.grad_accumulation_steps_g)?,
            window(train.grad_accumulation_steps_d)?,
        );

        let discriminator = factory.discriminator(options, rng)?;
        let feature = match losses.feature {
            Some(_) => {
                let mut f = factory.feature_extractor(options, rng)?;
                f.set_trainable(false);
                f.set_training(false);
                Some(f)
            }
            None => None,
        };

        Ok(Training {
            optimizer_g: Adam::new(g_size, train.lr_g, train.beta1_g, BETA2, EPSILON)
                .with_weight_decay(train.weight_decay_g),
            optimizer_d: Adam::new(
                discriminator.size(),
                train.lr_d,
                train.beta1_d,
                BETA2,
                EPSILON,
            )
            .with_weight_decay(train.weight_decay_d),
            scheduler_g: MultiStepLr::new(train.lr_g, train.lr_steps.clone(), train.lr_gamma),
            scheduler_d: MultiStepLr::new(train.lr_d, train.lr_steps.clone(), train.lr_gamma),
            policy: DUpdatePolicy::from_options(train),
            discriminator,
            feature,
            losses,
            accumulation,
            window_g: WindowState::default(),
            window_d: WindowState::default(),
            means_g: WindowMeans::default(),
            means_d: WindowMeans::default(),
        })
    }

    /// Moves a batch in. Generators that take noise get a per-sample noise channel prepended to
    /// their input, and when `need_hr` the target gets uniform quantization noise.
    ///
    /// # Errors
    /// `MissingInput` if `need_hr` and the batch has no high resolution target.
    pub fn feed_data(&mut self, batch: Batch, need_hr: bool) -> Result<()> {
        let Batch {
            lr,
            hr,
            reference,
            z,
        } = batch;

        let lr = if self.options.network_g.noise_input {
            let n = lr.dim().0;
            let z = match z {
                Some(z) if z.len() == n => z,
                Some(z) => {
                    return Err(TrainErr::InvalidConfig(format!(
                        "got {} noise values for a batch of {n}",
                        z.len()
                    )));
                }
                None => {
                    let normal = Normal::new(0.0f32, 1.0)?;
                    Array1::from_shape_simple_fn(n, || self.rng.sample(normal))
                }
            };
            with_noise_channel(lr.view(), &z)
        } else {
            lr
        };
        self.lr = Some(lr);

        if need_hr {
            let mut hr = hr.ok_or(TrainErr::MissingInput("HR"))?;
            let uniform = Uniform::new(0.0f32, 1.0)?;
            let rng = &mut self.rng;
            hr.mapv_inplace(|v| v + (rng.sample(uniform) - 0.5) / 255.0);

            self.reference = Some(reference.unwrap_or_else(|| hr.clone()));
            self.hr = Some(hr);
        }

        Ok(())
    }

    /// Runs one micro-step of training on the fed batch.
    ///
    /// # Arguments
    /// * `step` - The batch step, counting every micro-step since the start of training.
    pub fn optimize_parameters(&mut self, step: usize) -> Result<StepReport> {
        let training = self.training.as_mut().ok_or(TrainErr::NotTraining)?;
        let input = self.lr.as_ref().ok_or(TrainErr::MissingInput("LR"))?;
        let hr = self.hr.as_ref().ok_or(TrainErr::MissingInput("HR"))?;
        let reference = self.reference.as_ref().ok_or(TrainErr::MissingInput("ref"))?;

        let micro = training.accumulation.micro_step(step);
        if micro.first_d {
            training.policy.recompute(self.log.series("D_logits_diff"));
        }

        let out = self.generator.forward(input.view())?;
        let (_, _, out_h, out_w) = out.dim();
        let (fake, hr, reference) = match &self.domain {
            Some(domain) => (
                domain.unpad(out.view())?,
                domain.unpad(hr.view())?,
                domain.unpad(reference.view())?,
            ),
            None => (out, hr.clone(), reference.clone()),
        };

        let mut report = StepReport {
            gradient_step: micro.gradient_step,
            ..Default::default()
        };

        if training.policy.d_fires(micro.gradient_step) {
            if training.window_d.enter(micro.first_d) {
                report.d_updated = true;
                let flush =
                    training.discriminator_step(&micro, fake.view(), reference.view(), &mut self.rng)?;
                if let Some(flush) = flush {
                    report.d_optimizer_stepped = true;
                    self.log.record(flush);
                }
            } else {
                debug!(step = step; "discriminator window joined halfway, skipping");
            }
        } else if training.window_d.is_open() {
            debug!(step = step; "discriminator window abandoned");
            training.window_d.close();
            training.means_d.clear();
        }

        let g_fires = micro.g_allowed
            && training
                .policy
                .g_fires(micro.gradient_step, self.log.series("D_logits_diff"));

        if g_fires {
            if training.window_g.enter(micro.first_g) {
                report.g_updated = true;
                let (_, _, lr_h, lr_w) = input.dim();
                let inputs = GeneratorInputs {
                    input: input.view(),
                    fake: fake.view(),
                    hr: hr.view(),
                    reference: reference.view(),
                    out_size: (out_h, out_w),
                    lr_size: (lr_h, lr_w),
                };
                let flush = training.generator_step(
                    &micro,
                    self.generator.as_mut(),
                    self.domain.as_deref(),
                    inputs,
                )?;
                if let Some(flush) = flush {
                    report.g_optimizer_stepped = true;
                    self.log.record(flush);
                }
            } else {
                debug!(step = step; "generator window joined halfway, skipping");
            }
        } else if training.window_g.is_open() {
            debug!(step = step; "generator window abandoned");
            training.window_g.close();
            training.means_g.clear();
        }

        self.fake = Some(fake);
        Ok(report)
    }

    /// Runs the generator on the fed input in evaluation mode.
    pub fn test(&mut self) -> Result<()> {
        let input = self.lr.as_ref().ok_or(TrainErr::MissingInput("LR"))?;

        self.generator.set_training(false);
        let out = self.generator.forward(input.view());
        self.generator.set_training(true);

        self.fake = Some(out?);
        Ok(())
    }

    /// The latest value of every non-empty metric series.
    pub fn current_log(&self) -> BTreeMap<String, f64> {
        self.log.latest()
    }

    /// The input, output and target of the last step, only the first sample unless
    /// `entire_batch`.
    pub fn current_visuals(&self, need_hr: bool, entire_batch: bool) -> Result<Visuals> {
        let lr = self.lr.as_ref().ok_or(TrainErr::MissingInput("LR"))?;
        let sr = self.fake.as_ref().ok_or(TrainErr::MissingInput("SR"))?;
        let hr = if need_hr {
            Some(self.hr.as_ref().ok_or(TrainErr::MissingInput("HR"))?)
        } else {
            None
        };

        let pick = |x: &Array4<f32>| {
            if entire_batch {
                x.clone()
            } else {
                x.slice(s![0..1usize.min(x.len_of(Axis(0))), .., .., ..]).to_owned()
            }
        };

        Ok(Visuals {
            lr: pick(lr),
            sr: pick(sr),
            hr: hr.map(pick),
        })
    }

    /// Advances both learning rate schedules by one step.
    pub fn update_learning_rate(&mut self) -> Result<()> {
        let training = self.training.as_mut().ok_or(TrainErr::NotTraining)?;
        training.sync_learning_rates(None);
        Ok(())
    }

    /// The generator's learning rate.
    pub fn current_learning_rate(&self) -> Option<f32> {
        self.training
            .as_ref()
            .map(|training| training.optimizer_g.learning_rate())
    }

    pub fn log_validation_psnr(&mut self, step: usize, psnr: f64) {
        self.log.append("psnr_val", step, psnr);
    }

    /// Writes both networks' weights for `iter`.
    pub fn save(&self, iter: usize) -> Result<()> {
        self.checkpoints.save(self.generator.as_ref(), "G", iter)?;
        if let Some(training) = &self.training {
            self.checkpoints
                .save(training.discriminator.as_ref(), "D", iter)?;
        }
        Ok(())
    }

    pub fn save_log(&self) -> Result<()> {
        self.log.save(&self.options.path.log)?;
        Ok(())
    }

    pub fn load_log(&mut self) -> Result<()> {
        self.log.load(&self.options.path.log)
    }

    /// Plots the displayed metric series into the log directory.
    pub fn display_log_figure(&self) -> Result<()> {
        plot::plot_log(&self.log, &self.options.path.log)?;
        Ok(())
    }

    pub fn log(&self) -> &MetricsLog {
        &self.log
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn generator(&self) -> &dyn Network {
        self.generator.as_ref()
    }

    pub fn discriminator(&self) -> Option<&dyn Network> {
        self.training.as_ref().map(|t| t.discriminator.as_ref())
    }

    pub fn d_update_ratio(&self) -> Option<f64> {
        self.training.as_ref().map(|t| t.policy.ratio())
    }

    /// The iteration training resumed from, zero for fresh runs.
    pub fn start_iter(&self) -> usize {
        self.start_iter
    }

    fn resuming(&self) -> bool {
        self.options.is_train && self.options.train.resume
    }

    /// Restores the latest checkpoints and the metrics log when resuming, otherwise loads any
    /// configured pretrained weights.
    fn load(&mut self) -> Result<()> {
        if self.resuming() {
            let iter = self.checkpoints.resume(self.generator.as_mut(), "G")?;
            self.load_log()?;

            if let Some(training) = self.training.as_mut() {
                self.checkpoints
                    .resume(training.discriminator.as_mut(), "D")?;
                training.sync_learning_rates(Some(iter));
            }

            self.start_iter = iter;
            return Ok(());
        }

        if let Some(path) = &self.options.path.pretrain_model_g {
            info!("loading model for G [{}] ...", path.display());
            checkpoint::load_params(self.generator.as_mut(), path)?;
        }

        if let (Some(path), Some(training)) =
            (&self.options.path.pretrain_model_d, self.training.as_mut())
        {
            info!("loading model for D [{}] ...", path.display());
            checkpoint::load_params(training.discriminator.as_mut(), path)?;
        }

        Ok(())
    }

    fn print_network(&self) -> Result<()> {
        let Some(training) = &self.training else {
            info!("Number of parameters in G: {}", self.generator.size());
            return Ok(());
        };

        let models = &self.options.path.models;
        let dir = models.parent().unwrap_or(Path::new("."));

        report::report_networks(
            dir,
            self.generator.as_ref(),
            training.discriminator.as_ref(),
            training.feature.as_deref(),
            !self.resuming(),
        )
    }
}

/// Prepends one channel holding each sample's noise value everywhere.
fn with_noise_channel(lr: ArrayView4<f32>, z: &Array1<f32>) -> Array4<f32> {
    let (n, c, h, w) = lr.dim();

    Array4::from_shape_fn((n, c + 1, h, w), |(b, ch, i, j)| {
        if ch == 0 {
            z[b]
        } else {
            lr[[b, ch - 1, i, j]]
        }
    })
}

impl Training {
    /// Steps both schedules, or jumps them to `epoch`, and hands the resulting rates to the
    /// optimizers.
    fn sync_learning_rates(&mut self, epoch: Option<usize>) {
        let (lr_g, lr_d) = match epoch {
            Some(epoch) => {
                self.scheduler_g.set_epoch(epoch);
                self.scheduler_d.set_epoch(epoch);
                (self.scheduler_g.lr(), self.scheduler_d.lr())
            }
            None => (self.scheduler_g.step(), self.scheduler_d.step()),
        };

        if lr_g != self.optimizer_g.learning_rate() || lr_d != self.optimizer_d.learning_rate() {
            debug!(lr_g = lr_g, lr_d = lr_d; "learning rates changed");
        }

        self.optimizer_g.set_learning_rate(lr_g);
        self.optimizer_d.set_learning_rate(lr_d);
    }

    fn discriminator_step(
        &mut self,
        micro: &MicroStep,
        fake: ArrayView4<f32>,
        reference: ArrayView4<f32>,
        rng: &mut StdRng,
    ) -> Result<Option<Flush>> {
        let d = self.discriminator.as_mut();
        d.set_trainable(true);

        if micro.first_d {
            d.zero_grad();
            self.means_d.clear();
        }

        // The fake images carry no gradient back to the generator here.
        let pred_real = d.forward(reference)?;
        let pred_fake = d.forward(fake)?;
        let loss = adversarial::discriminator_loss(
            &self.losses.gan.criterion,
            self.losses.relativistic,
            pred_real.view(),
            pred_fake.view(),
        );

        d.backward(reference, loss.grad_real.view())?;
        d.backward(fake, loss.grad_fake.view())?;

        if let Some(gp) = &mut self.losses.gradient_penalty {
            let n = reference.len_of(Axis(0));
            let uniform = Uniform::new(0.0f32, 1.0)?;
            gp.alphas.resize(n, 0.0);
            gp.alphas.iter_mut().for_each(|a| *a = rng.sample(uniform));

            let alphas = &gp.alphas;
            let interp = Array4::from_shape_fn(reference.dim(), |(b, c, i, j)| {
                alphas[b] * fake[[b, c, i, j]] + (1.0 - alphas[b]) * reference[[b, c, i, j]]
            });
            let critic = d.forward(interp.view())?;
            let grad = d.input_grad(interp.view(), Array4::ones(critic.dim()).view())?;

            let l_d_gp = gp.penalty.weight * gp.penalty.criterion.loss(grad.view());
            let v = gp.penalty.criterion.loss_prime(grad.view());
            adversarial::penalty_backward(d, interp.view(), v.view(), gp.penalty.weight)?;
            self.means_d.push("l_d_gp", f64::from(l_d_gp));
        }

        let d_real = pred_real.mean().unwrap_or_default();
        let d_fake = pred_fake.mean().unwrap_or_default();
        self.means_d.push("l_d_real", f64::from(loss.real));
        self.means_d.push("l_d_fake", f64::from(loss.fake));
        self.means_d.push("D_real", f64::from(d_real));
        self.means_d.push("D_fake", f64::from(d_fake));
        self.means_d.push("D_logits_diff", f64::from(d_real - d_fake));

        if !micro.last_d {
            return Ok(None);
        }

        d.optimize(&mut self.optimizer_d)?;
        self.window_d.close();

        let mut entries: Vec<(&'static str, f64)> = self
            .means_d
            .means()
            .into_iter()
            .filter(|(key, _)| *key != "l_d_gp")
            .collect();
        if let Some(last) = self.means_d.last("l_d_gp") {
            entries.push(("l_d_gp", last));
        }
        entries.push(("D_update_ratio", self.policy.ratio()));
        self.means_d.clear();

        Ok(Some(Flush {
            step: micro.gradient_step,
            entries,
        }))
    }

    fn generator_step(
        &mut self,
        micro: &MicroStep,
        generator: &mut dyn Network,
        domain: Option<&dyn DomainWrap>,
        inputs: GeneratorInputs<'_>,
    ) -> Result<Option<Flush>> {
        let GeneratorInputs {
            input,
            fake,
            hr,
            reference,
            out_size,
            lr_size,
        } = inputs;
        let (_, _, fake_h, fake_w) = fake.dim();

        self.discriminator.set_trainable(false);
        if micro.first_g {
            generator.zero_grad();
            self.means_g.clear();
        }

        let mut d_fake = Array4::zeros(fake.dim());

        if let Some(pixel) = &self.losses.pixel {
            let l_g_pix = match self.losses.pixel_domain {
                Domain::Hr => {
                    d_fake.scaled_add(pixel.weight, &pixel.criterion.loss_prime(fake, hr));
                    pixel.criterion.loss(fake, hr)
                }
                Domain::Lr => {
                    let fake_lr = bilinear(fake, lr_size);
                    let hr_lr = bilinear(hr, lr_size);
                    let grad = pixel.criterion.loss_prime(fake_lr.view(), hr_lr.view()) * pixel.weight;
                    d_fake += &bilinear_backward(grad.view(), (fake_h, fake_w));
                    pixel.criterion.loss(fake_lr.view(), hr_lr.view())
                }
            };
            self.means_g.push("l_g_pix", f64::from(l_g_pix));
        }

        if let (Some(term), Some(f)) = (&self.losses.feature, &self.feature) {
            let (fake_in, real_in) = match self.losses.feature_domain {
                Domain::Hr => (fake.to_owned(), hr.to_owned()),
                Domain::Lr => (bilinear(fake, lr_size), bilinear(hr, lr_size)),
            };

            let real_fea = f.forward(real_in.view())?;
            let fake_fea = f.forward(fake_in.view())?;
            let l_g_fea = term.criterion.loss(fake_fea.view(), real_fea.view());

            let grad = term.criterion.loss_prime(fake_fea.view(), real_fea.view()) * term.weight;
            let grad = f.input_grad(fake_in.view(), grad.view())?;
            match self.losses.feature_domain {
                Domain::Hr => d_fake += &grad,
                Domain::Lr => d_fake += &bilinear_backward(grad.view(), (fake_h, fake_w)),
            }

            self.means_g.push("l_g_fea", f64::from(l_g_fea));
        }

        if let Some(range) = &self.losses.range {
            d_fake.scaled_add(range.weight, &range.criterion.loss_prime(fake));
            self.means_g
                .push("l_g_range", f64::from(range.criterion.loss(fake)));
        }

        let d = self.discriminator.as_ref();
        let pred_fake = d.forward(fake)?;
        let pred_real = d.forward(reference)?;
        let (l_g_gan, d_pred) = adversarial::generator_loss(
            &self.losses.gan.criterion,
            self.losses.relativistic,
            self.losses.gan.weight,
            pred_real.view(),
            pred_fake.view(),
        );
        d_fake += &d.input_grad(fake, d_pred.view())?;
        self.means_g.push("l_g_gan", f64::from(l_g_gan));

        let d_out = match domain {
            Some(domain) => domain.unpad_backward(d_fake.view(), out_size)?,
            None => d_fake,
        };
        generator.backward(input, d_out.view())?;

        if !micro.last_g {
            return Ok(None);
        }

        generator.optimize(&mut self.optimizer_g)?;
        self.window_g.close();

        let entries = self.means_g.means();
        self.means_g.clear();

        Ok(Some(Flush {
            step: micro.gradient_step,
            entries,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::PointwiseFactory;

    fn options(dir: &Path, train: serde_json::Value) -> Options {
        let mut json = serde_json::json!({
            "scale": 2,
            "seed": 11,
            "path": {
                "models": dir.join("models"),
                "log": dir.join("log"),
            },
            "network_g": { "in_nc": 1, "out_nc": 1, "nf": 3, "nb": 0 },
            "network_d": { "in_nc": 1, "nf": 3, "nb": 1 },
            "train": { "pixel_weight": 1.0, "gan_weight": 0.01, "niter": 4 },
        });
        if let (Some(base), Some(extra)) = (json["train"].as_object_mut(), train.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(json).unwrap()
    }

    fn batch(seed: u64) -> Batch {
        Batch::synthetic(&mut StdRng::seed_from_u64(seed), (2, 1), 4, 2).unwrap()
    }

    #[test]
    fn noise_channel_is_prepended() {
        let z = Array1::from_vec(vec![0.5, -1.0]);
        let lr = Array4::ones((2, 2, 3, 3));
        let x = with_noise_channel(lr.view(), &z);

        assert_eq!(x.dim(), (2, 3, 3, 3));
        assert!(x.slice(s![0, 0, .., ..]).iter().all(|&v| v == 0.5));
        assert!(x.slice(s![1, 0, .., ..]).iter().all(|&v| v == -1.0));
        assert!(x.slice(s![.., 1.., .., ..]).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn feeding_adds_quantization_noise_and_defaults_the_reference() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = SrRaGanModel::new(options(dir.path(), serde_json::json!({})), &PointwiseFactory).unwrap();

        let batch = batch(0);
        let clean = batch.hr.clone().unwrap();
        model.feed_data(batch, true).unwrap();

        let hr = model.hr.as_ref().unwrap();
        assert_eq!(model.reference.as_ref(), Some(hr));
        assert!(hr.iter().zip(&clean).all(|(a, b)| (a - b).abs() <= 0.5 / 255.0 + 1e-6));
        assert!(hr.iter().zip(&clean).any(|(a, b)| a != b));
    }

    #[test]
    fn missing_target_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = SrRaGanModel::new(options(dir.path(), serde_json::json!({})), &PointwiseFactory).unwrap();

        let lr_only = Batch::new(batch(0).lr);
        assert!(matches!(
            model.feed_data(lr_only.clone(), true),
            Err(TrainErr::MissingInput("HR"))
        ));

        model.feed_data(lr_only, false).unwrap();
        assert!(matches!(
            model.optimize_parameters(0),
            Err(TrainErr::MissingInput("HR"))
        ));
    }

    #[test]
    fn unsupported_lr_scheme_fails_at_construction() {
        let dir = tempfile::tempdir().unwrap();
        let result = SrRaGanModel::new(
            options(dir.path(), serde_json::json!({ "lr_scheme": "CosineAnnealing" })),
            &PointwiseFactory,
        );
        assert!(matches!(result, Err(TrainErr::UnsupportedLrScheme(_))));
    }

    #[test]
    fn test_restores_training_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = SrRaGanModel::new(options(dir.path(), serde_json::json!({})), &PointwiseFactory).unwrap();
        model.feed_data(batch(1), false).unwrap();

        model.test().unwrap();

        assert!(model.generator().is_training());
        let visuals = model.current_visuals(false, false).unwrap();
        assert_eq!(visuals.sr.dim(), (1, 1, 8, 8));
        assert_eq!(visuals.lr.dim(), (1, 1, 4, 4));
        assert!(visuals.hr.is_none());
    }

    #[test]
    fn learning_rate_follows_the_milestones() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = SrRaGanModel::new(
            options(dir.path(), serde_json::json!({ "lr_g": 1.0, "lr_steps": [2], "lr_gamma": 0.5 })),
            &PointwiseFactory,
        )
        .unwrap();

        assert_eq!(model.current_learning_rate(), Some(1.0));
        model.update_learning_rate().unwrap();
        assert_eq!(model.current_learning_rate(), Some(1.0));
        model.update_learning_rate().unwrap();
        assert_eq!(model.current_learning_rate(), Some(0.5));
    }

    #[test]
    fn inference_models_refuse_to_train() {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path(), serde_json::json!({}));
        opts.is_train = false;
        let mut model = SrRaGanModel::new(opts, &PointwiseFactory).unwrap();

        model.feed_data(batch(2), true).unwrap();
        assert!(matches!(model.optimize_parameters(0), Err(TrainErr::NotTraining)));
        assert!(model.discriminator().is_none());
    }

    #[test]
    fn report_is_written_next_to_the_models() {
        let dir = tempfile::tempdir().unwrap();
        SrRaGanModel::new(options(dir.path(), serde_json::json!({})), &PointwiseFactory).unwrap();

        let report = std::fs::read_to_string(dir.path().join(report::REPORT_FILE)).unwrap();
        assert!(report.contains("Generator"));
        assert!(report.contains("Discriminator"));
        assert!(!report.contains("Perceptual"));
    }
}
