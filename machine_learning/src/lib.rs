pub mod arch;
pub mod error;
pub mod optimization;
pub mod resize;
pub mod tensor;

pub use error::{MlErr, Result};
