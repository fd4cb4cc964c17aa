pub mod adversarial;
pub mod batch;
pub mod checkpoint;
pub mod configs;
pub mod d_update;
pub mod domain;
pub mod error;
pub mod factory;
pub mod losses;
pub mod metrics;
pub mod model;
pub mod plot;
pub mod report;
pub mod run;
pub mod schedule;

pub use batch::Batch;
pub use configs::Options;
pub use error::{Result, TrainErr};
pub use factory::{NetworkFactory, PointwiseFactory};
pub use metrics::MetricsLog;
pub use model::{SrRaGanModel, StepReport, Visuals};
