use std::{error::Error, fmt, io, path::PathBuf};

use machine_learning::MlErr;
use rand_distr::{NormalError, uniform::Error as UniformError};
use safetensors::SafeTensorError;

/// The trainer's result type.
pub type Result<T> = std::result::Result<T, TrainErr>;

/// Every way a training run can fail.
#[derive(Debug)]
pub enum TrainErr {
    /// Invalid configuration, caught before the first step.
    InvalidConfig(String),
    UnrecognizedCriterion(String),
    UnrecognizedGanType(String),
    UnsupportedLrScheme(String),
    /// Resuming found no checkpoint for `network` in `dir`.
    MissingCheckpoint {
        dir: PathBuf,
        network: &'static str,
    },
    /// A step needed a tensor that was never fed.
    MissingInput(&'static str),
    /// A training operation was called on a model built for inference.
    NotTraining,
    Distribution(String),
    Ml(MlErr),
    Io(io::Error),
    Json(serde_json::Error),
    Checkpoint(String),
    Plot(String),
    LogFormat {
        key: String,
        reason: String,
    },
}

impl fmt::Display for TrainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::UnrecognizedCriterion(name) => {
                write!(f, "loss type [{name}] is not recognized")
            }
            Self::UnrecognizedGanType(name) => write!(f, "GAN type [{name}] is not recognized"),
            Self::UnsupportedLrScheme(name) => {
                write!(f, "learning rate scheme [{name}] is not supported")
            }
            Self::MissingCheckpoint { dir, network } => write!(
                f,
                "no checkpoint for {network} found in {}",
                dir.display()
            ),
            Self::MissingInput(name) => write!(f, "missing input tensor: {name}"),
            Self::NotTraining => write!(f, "the model was not built for training"),
            Self::Distribution(msg) => write!(f, "invalid distribution: {msg}"),
            Self::Ml(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Json(e) => write!(f, "json error: {e}"),
            Self::Checkpoint(msg) => write!(f, "checkpoint error: {msg}"),
            Self::Plot(msg) => write!(f, "plot error: {msg}"),
            Self::LogFormat { key, reason } => {
                write!(f, "malformed log series {key}: {reason}")
            }
        }
    }
}

impl Error for TrainErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Ml(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for TrainErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<io::Error> for TrainErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for TrainErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SafeTensorError> for TrainErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Checkpoint(value.to_string())
    }
}

impl From<NormalError> for TrainErr {
    fn from(value: NormalError) -> Self {
        Self::Distribution(value.to_string())
    }
}

impl From<UniformError> for TrainErr {
    fn from(value: UniformError) -> Self {
        Self::Distribution(value.to_string())
    }
}

/// Boundary conversion for the binary.
impl From<TrainErr> for io::Error {
    fn from(value: TrainErr) -> Self {
        match value {
            TrainErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
