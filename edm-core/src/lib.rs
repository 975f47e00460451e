//! Materials, process parameters, and numeric constraints for EDM voxel
//! erosion modeling.
//!
//! The types here describe *what* is being machined and *how* the generator
//! is driven.
//! They are validated once at construction and then shared read-only by the
//! simulation engine in `edm-sim`.

pub mod constraint;

mod material;
mod process;

pub use material::{Material, MaterialConfig, MaterialError};
pub use process::{ProcessConfig, ProcessError, ProcessParameters};
