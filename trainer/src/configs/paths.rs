use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PathOptions {
    /// Where checkpoints are written to and resumed from.
    pub models: PathBuf,
    /// Where the metrics archive and plots go.
    pub log: PathBuf,
    pub pretrain_model_g: Option<PathBuf>,
    pub pretrain_model_d: Option<PathBuf>,
}
