//! Reporting utilities: console summaries of a pipeline run.

pub mod format;

pub use format::*;
