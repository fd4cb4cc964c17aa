use std::{fs, path::Path};

use log::info;
use machine_learning::arch::Network;

use crate::error::Result;

pub const REPORT_FILE: &str = "network.txt";

/// Logs the size of every network and, unless `write` is false, describes them in
/// `network.txt` inside `dir`.
pub fn report_networks(
    dir: &Path,
    generator: &dyn Network,
    discriminator: &dyn Network,
    feature: Option<&dyn Network>,
    write: bool,
) -> Result<()> {
    info!("Number of parameters in G: {}", generator.size());
    info!(
        "Number of parameters in D: {}. Receptive field size: {}",
        discriminator.size(),
        discriminator.receptive_field()
    );
    if let Some(f) = feature {
        info!("Number of parameters in F: {}", f.size());
    }

    if !write {
        return Ok(());
    }

    let mut message = format!(
        "-------------- Generator --------------\n{}\n",
        generator.describe()
    );
    message += &format!(
        "\n\n\n-------------- Discriminator --------------\n{}\n",
        discriminator.describe()
    );
    if let Some(f) = feature {
        message += &format!(
            "\n\n\n-------------- Perceptual Network --------------\n{}\n",
            f.describe()
        );
    }

    fs::create_dir_all(dir)?;
    fs::write(dir.join(REPORT_FILE), message)?;
    Ok(())
}
