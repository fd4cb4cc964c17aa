mod criterion;
mod gan;
mod gradient_penalty;
mod l1;
mod loss_fn;
mod mse;
mod range;

pub use criterion::Criterion;
pub use gan::{GanKind, GanLoss};
pub use gradient_penalty::GradientPenalty;
pub use l1::L1;
pub use loss_fn::LossFn;
pub use mse::Mse;
pub use range::RangeLoss;
