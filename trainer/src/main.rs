use std::{env, io};

use log::info;

use trainer::{Options, PointwiseFactory, SrRaGanModel, run};

const DEFAULT_OPTIONS: &str = "options/train_srragan.json";

fn main() -> io::Result<()> {
    env_logger::init();

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OPTIONS.to_string());
    info!("reading options from {path}");

    let options = Options::from_file(&path)?;
    let mut model = SrRaGanModel::new(options, &PointwiseFactory)?;
    run::train(&mut model)?;

    Ok(())
}
