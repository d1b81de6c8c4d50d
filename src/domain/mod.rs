//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - tabular inputs (`Table`, `Column`, `ColumnData`)
//! - normalization outputs (`NormalizedTable`, `ScaleRecord`, `ZeroRangePolicy`)
//! - analysis outputs (`ClusterAssignment`, `FittedModel`, `UncertaintyEnvelope`, etc.)

pub mod types;

pub use types::*;
