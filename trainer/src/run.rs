use log::info;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    batch::Batch,
    error::{Result, TrainErr},
    metrics,
    model::SrRaGanModel,
};

const BATCH_SIZE: usize = 4;
const LR_SIDE: usize = 8;
const VALIDATION_SEED: u64 = 0;

/// Trains `model` on synthetic batches until `niter` batch steps, picking up where a resumed
/// run left off.
pub fn train(model: &mut SrRaGanModel) -> Result<()> {
    let options = model.options().clone();
    let (n, c) = (BATCH_SIZE, options.network_g.in_nc);
    if c != options.network_g.out_nc {
        return Err(TrainErr::InvalidConfig(
            "synthetic batches need as many input as output channels".into(),
        ));
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };

    let start = model.start_iter();
    info!("start training from iter: {start}");

    for step in start..options.train.niter {
        let batch = Batch::synthetic(&mut rng, (n, c), LR_SIDE, options.scale)?;
        model.feed_data(batch, true)?;
        model.optimize_parameters(step)?;
        model.update_learning_rate()?;

        let iter = step + 1;
        if iter % options.logger.print_freq == 0 {
            let lr = model.current_learning_rate().unwrap_or_default();
            let mut message = format!("<iter:{iter:8}, lr:{lr:.3e}> ");
            for (key, value) in model.current_log() {
                message += &format!("{key}: {value:.4e} ");
            }
            info!("{message}");
        }

        if options.train.val_freq > 0 && iter % options.train.val_freq == 0 {
            let psnr = validate(model)?;
            model.log_validation_psnr(step, psnr);
            info!("<iter:{iter:8}> psnr: {psnr:.4e}");
        }

        if iter % options.logger.save_checkpoint_freq == 0 {
            info!("saving models and training states");
            checkpoint(model, iter)?;
        }
    }

    info!("saving the final model");
    checkpoint(model, options.train.niter)?;
    info!("end of training");
    Ok(())
}

fn checkpoint(model: &SrRaGanModel, iter: usize) -> Result<()> {
    model.save(iter)?;
    model.save_log()?;
    model.display_log_figure()
}

/// PSNR of the generator on a fixed synthetic batch.
fn validate(model: &mut SrRaGanModel) -> Result<f64> {
    let options = model.options();
    let (c, scale, peak) = (options.network_g.in_nc, options.scale, options.range[1]);

    let mut rng = StdRng::seed_from_u64(VALIDATION_SEED);
    let batch = Batch::synthetic(&mut rng, (1, c), LR_SIDE, scale)?;
    let hr = batch.hr.clone().ok_or(TrainErr::MissingInput("HR"))?;

    model.feed_data(batch, false)?;
    model.test()?;
    let visuals = model.current_visuals(false, true)?;

    Ok(metrics::psnr(visuals.sr.view(), hr.view(), peak))
}
