//! Numerical utilities: min–max scaling, statistics and least squares.

pub mod ols;
pub mod scaling;
pub mod stats;

pub use ols::*;
pub use scaling::*;
pub use stats::*;
