//! Curve fitting and uncertainty envelopes.
//!
//! Responsibilities:
//!
//! - fit power / sigmoid models by Levenberg–Marquardt (`fitter`)
//! - compute `±sigma` confidence envelopes over every parameter corner (`band`)

pub mod band;
pub mod fitter;

pub use band::*;
pub use fitter::*;
