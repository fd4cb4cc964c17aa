mod avg_pool;
mod layer;
mod pointwise;
mod upsample;

pub use avg_pool::AvgPool;
pub use layer::Layer;
pub use pointwise::Pointwise;
pub use upsample::Upsample;
