mod common;

use serde_json::json;

use trainer::{PointwiseFactory, SrRaGanModel, StepReport, d_update::adaptive_ratio};

use common::{batches, options, steps};

fn run(model: &mut SrRaGanModel, count: usize) -> Vec<StepReport> {
    batches(count)
        .into_iter()
        .enumerate()
        .map(|(step, batch)| {
            model.feed_data(batch, true).unwrap();
            model.optimize_parameters(step).unwrap()
        })
        .collect()
}

#[test]
fn equal_windows_step_both_optimizers_once_per_window() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(
        dir.path(),
        json!({ "grad_accumulation_steps_g": 2, "grad_accumulation_steps_d": 2 }),
    );
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    let reports = run(&mut model, 4);

    let d_steps = reports.iter().filter(|r| r.d_optimizer_stepped).count();
    let g_steps = reports.iter().filter(|r| r.g_optimizer_stepped).count();
    assert_eq!((d_steps, g_steps), (2, 2));
    assert!(reports.iter().all(|r| r.d_updated && r.g_updated));
    assert_eq!(
        reports.iter().map(|r| r.gradient_step).collect::<Vec<_>>(),
        [0, 0, 1, 1]
    );

    let log = model.log();
    for key in ["l_d_real", "l_d_fake", "D_logits_diff", "l_g_pix", "l_g_gan"] {
        assert_eq!(steps(log.series(key)), [0, 1], "{key}");
    }
    assert!(log.series("l_g_range").is_empty());
    assert!(log.series("l_d_gp").is_empty());
}

#[test]
fn generator_only_updates_in_the_tail_of_a_longer_discriminator_window() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(
        dir.path(),
        json!({ "grad_accumulation_steps_g": 1, "grad_accumulation_steps_d": 2 }),
    );
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    let reports = run(&mut model, 4);

    let g_updated: Vec<bool> = reports.iter().map(|r| r.g_updated).collect();
    assert_eq!(g_updated, [false, true, false, true]);
    assert_eq!(steps(model.log().series("l_g_gan")), [0, 1]);
    assert_eq!(steps(model.log().series("l_d_real")), [0, 1]);
}

#[test]
fn generator_waits_for_the_discriminator_warm_up() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(dir.path(), json!({ "d_init_iters": 5 }));
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    let reports = run(&mut model, 8);

    assert!(reports.iter().all(|r| r.d_optimizer_stepped));
    assert_eq!(steps(model.log().series("l_d_real")), (0..8).collect::<Vec<_>>());
    assert_eq!(steps(model.log().series("l_g_gan")), [5, 6, 7]);
}

#[test]
fn slower_discriminator_skips_logical_steps() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(dir.path(), json!({ "d_update_ratio": 0.5 }));
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    run(&mut model, 4);

    assert_eq!(steps(model.log().series("l_d_real")), [0, 2]);
    assert_eq!(steps(model.log().series("l_g_gan")), [0, 1, 2, 3]);
    assert!(
        model
            .log()
            .series("D_update_ratio")
            .iter()
            .all(|&(_, ratio)| ratio == 0.5)
    );
}

#[test]
fn gradient_penalty_is_logged_with_wgan() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(dir.path(), json!({ "gan_type": "wgan-gp", "gp_weight": 10.0 }));
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    run(&mut model, 2);

    let gp = model.log().series("l_d_gp");
    assert_eq!(steps(gp), [0, 1]);
    assert!(gp.iter().all(|&(_, value)| value.is_finite() && value >= 0.0));
}

#[test]
fn every_configured_term_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(
        dir.path(),
        json!({
            "feature_weight": 1.0,
            "feature_domain": "LR",
            "range_weight": 1.0,
            "pixel_domain": "LR",
        }),
    );
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    run(&mut model, 1);

    let latest = model.current_log();
    for key in ["l_g_pix", "l_g_fea", "l_g_range", "l_g_gan", "l_d_real", "D_update_ratio"] {
        assert!(latest.get(key).is_some_and(|v| v.is_finite()), "{key}");
    }
}

#[test]
fn training_moves_both_networks() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = SrRaGanModel::new(options(dir.path(), json!({})), &PointwiseFactory).unwrap();
    let g_before = model.generator().params().to_vec();
    let d_before = model.discriminator().unwrap().params().to_vec();

    run(&mut model, 2);

    assert_ne!(model.generator().params(), &g_before[..]);
    assert_ne!(model.discriminator().unwrap().params(), &d_before[..]);
}

#[test]
fn adaptive_ratio_bootstraps_then_follows_the_logit_gap() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(
        dir.path(),
        json!({ "d_update_ratio": 0.0, "d_valid_steps_for_g_update": 2 }),
    );
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    // The slowest adaptive discriminator still fires within 50 logical steps.
    run(&mut model, 52);

    let log = model.log();
    let ratios = log.series("D_update_ratio");
    let gaps = log.series("D_logits_diff");
    assert!(ratios.len() >= 3);
    assert_eq!(&ratios[..2], [(0, 2.0), (1, 2.0)]);

    for &(step, ratio) in &ratios[2..] {
        let history: Vec<f64> = gaps
            .iter()
            .filter(|&&(s, _)| s < step)
            .map(|&(_, gap)| gap)
            .collect();
        let recent = &history[history.len() - 2..];
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;

        let expected = adaptive_ratio(mean);
        assert!((ratio - expected).abs() < 1e-12, "step {step}: {ratio} vs {expected}");
    }
}

#[test]
fn unconvincing_discriminator_holds_the_generator_back() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(
        dir.path(),
        json!({ "d_valid_steps_for_g_update": 2, "min_d_prob_ratio_for_g": 1e6 }),
    );
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    let reports = run(&mut model, 6);

    // Two logit gaps are already logged by the second step's generator check.
    assert_eq!(steps(model.log().series("l_g_gan")), [0]);
    assert_eq!(steps(model.log().series("l_d_real")), (0..6).collect::<Vec<_>>());
    assert!(reports[1..].iter().all(|r| !r.g_updated));
}

#[test]
fn generator_window_is_abandoned_when_it_stops_firing() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(
        dir.path(),
        json!({
            "grad_accumulation_steps_g": 2,
            "d_valid_steps_for_g_update": 2,
            "min_d_prob_ratio_for_g": 1e6,
        }),
    );
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();
    let g_before = model.generator().params().to_vec();

    let reports = run(&mut model, 4);

    let g_updated: Vec<bool> = reports.iter().map(|r| r.g_updated).collect();
    assert_eq!(g_updated, [true, false, false, false]);
    assert!(reports.iter().all(|r| !r.g_optimizer_stepped));
    assert!(model.log().series("l_g_gan").is_empty());
    assert_eq!(model.generator().params(), &g_before[..]);
}

#[test]
fn slow_discriminator_skips_whole_windows() {
    let dir = tempfile::tempdir().unwrap();
    let options = options(
        dir.path(),
        json!({
            "d_update_ratio": 0.5,
            "grad_accumulation_steps_g": 2,
            "grad_accumulation_steps_d": 2,
        }),
    );
    let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();

    let reports = run(&mut model, 8);

    let d_updated: Vec<bool> = reports.iter().map(|r| r.d_updated).collect();
    assert_eq!(
        d_updated,
        [true, true, false, false, true, true, false, false]
    );
    assert_eq!(steps(model.log().series("l_d_real")), [0, 2]);
    assert_eq!(steps(model.log().series("l_g_gan")), [0, 1, 2, 3]);
}

#[test]
fn gradient_penalty_weight_changes_the_discriminator() {
    let trained_d = |gp_weight: f64| {
        let dir = tempfile::tempdir().unwrap();
        let options = options(
            dir.path(),
            json!({ "gan_type": "wgan-gp", "gp_weight": gp_weight }),
        );
        let mut model = SrRaGanModel::new(options, &PointwiseFactory).unwrap();
        run(&mut model, 3);
        model.discriminator().unwrap().params().to_vec()
    };

    let without = trained_d(0.0);
    let with = trained_d(1000.0);

    let largest = without
        .iter()
        .zip(&with)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(largest > 1e-6, "penalty left D unchanged");
}
