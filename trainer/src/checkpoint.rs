use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use machine_learning::arch::Network;
use safetensors::{Dtype, SafeTensors, tensor::TensorView};

use crate::error::{Result, TrainErr};

const TENSOR_NAME: &str = "params";
const EXTENSION: &str = "safetensors";

/// Saves and restores network weights as `<iter>_<label>.safetensors` files in one directory.
#[derive(Debug, Clone)]
pub struct Checkpoints {
    dir: PathBuf,
}

impl Checkpoints {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, iter: usize, label: &str) -> PathBuf {
        self.dir.join(format!("{iter}_{label}.{EXTENSION}"))
    }

    /// Writes `network`'s parameters as the `label` checkpoint for `iter`.
    pub fn save(&self, network: &dyn Network, label: &str, iter: usize) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(iter, label);
        save_params(network.params(), &path)?;
        info!("saved {label} at iteration {iter} to {}", path.display());
        Ok(path)
    }

    /// Finds the `label` checkpoint with the greatest iteration.
    pub fn latest(&self, label: &str) -> Result<Option<(usize, PathBuf)>> {
        if !self.dir.is_dir() {
            return Ok(None);
        }

        let suffix = format!("_{label}.{EXTENSION}");
        let mut best: Option<(usize, PathBuf)> = None;

        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(iter) = name
                .strip_suffix(&suffix)
                .and_then(|prefix| prefix.parse::<usize>().ok())
            else {
                continue;
            };

            if best.as_ref().is_none_or(|(b, _)| iter > *b) {
                best = Some((iter, path));
            }
        }

        Ok(best)
    }

    /// Loads the latest `label` checkpoint into `network`.
    ///
    /// # Errors
    /// `MissingCheckpoint` if there's none.
    pub fn resume(
        &self,
        network: &mut dyn Network,
        label: &'static str,
    ) -> Result<usize> {
        let (iter, path) = self.latest(label)?.ok_or_else(|| TrainErr::MissingCheckpoint {
            dir: self.dir.clone(),
            network: label,
        })?;

        info!("Resuming training with model for {label} [{}] ...", path.display());
        load_params(network, &path)?;
        Ok(iter)
    }
}

/// Writes `params` as a single F32 tensor.
pub fn save_params(params: &[f32], path: &Path) -> Result<()> {
    let view = TensorView::new(Dtype::F32, vec![params.len()], bytemuck::cast_slice(params))?;
    safetensors::serialize_to_file([(TENSOR_NAME, view)], &None, path)?;
    Ok(())
}

/// Reads the parameter tensor stored at `path` into `network`.
pub fn load_params(network: &mut dyn Network, path: &Path) -> Result<()> {
    let bytes = fs::read(path)?;
    let tensors = SafeTensors::deserialize(&bytes)?;
    let view = tensors.tensor(TENSOR_NAME)?;

    if view.dtype() != Dtype::F32 {
        return Err(TrainErr::Checkpoint(format!(
            "{} holds {:?} parameters, expected F32",
            path.display(),
            view.dtype()
        )));
    }

    let params: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());
    network.load_params(&params)?;
    Ok(())
}
