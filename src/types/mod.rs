//! Type definitions for streamatlas

mod country;
mod error;
mod stats;
mod track;

pub use country::*;
pub use error::*;
pub use stats::*;
pub use track::*;
