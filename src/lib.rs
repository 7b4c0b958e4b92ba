//! Exports a trained feed-forward network's parameters as `.npy` arrays plus a shape record,
//! and proves the export is faithful by re-evaluating it from the raw arrays alone.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pinn;
pub mod pipeline;
pub mod verification;

pub use error::{ExportErr, Result};
