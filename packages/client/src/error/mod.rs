pub mod classification;
pub mod constructors;
pub mod types;

// Re-export main types and functions
pub use constructors::*;
pub use types::{Error, Kind, Result};

pub(crate) use types::BoxError;
