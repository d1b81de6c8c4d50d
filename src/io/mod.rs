//! Input/output helpers.
//!
//! - World Bank CSV ingest (`ingest`)
//! - cluster CSV and fit JSON exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
