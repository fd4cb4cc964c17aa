use std::path::Path;

use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

use trainer::{Batch, Options};

/// A tiny single-channel setup writing everything under `dir`, with `train` merged over the
/// defaults.
pub fn options(dir: &Path, train: Value) -> Options {
    let mut options = json!({
        "name": "tiny",
        "scale": 2,
        "seed": 3,
        "path": {
            "models": dir.join("experiment").join("models"),
            "log": dir.join("experiment").join("log"),
        },
        "network_g": { "in_nc": 1, "out_nc": 1, "nf": 4, "nb": 1 },
        "network_d": { "in_nc": 1, "nf": 4, "nb": 1 },
        "train": {
            "niter": 4,
            "pixel_weight": 1.0,
            "gan_weight": 0.005,
            "lr_g": 1e-3,
            "lr_d": 1e-3,
        },
        "logger": { "print_freq": 1, "save_checkpoint_freq": 2 },
    });

    if let (Some(base), Some(extra)) = (options["train"].as_object_mut(), train.as_object()) {
        base.extend(extra.clone());
    }
    serde_json::from_value(options).unwrap()
}

pub fn batches(count: usize) -> Vec<Batch> {
    let mut rng = StdRng::seed_from_u64(17);
    (0..count)
        .map(|_| Batch::synthetic(&mut rng, (2, 1), 4, 2).unwrap())
        .collect()
}

pub fn steps(series: &[(usize, f64)]) -> Vec<usize> {
    series.iter().map(|&(step, _)| step).collect()
}
