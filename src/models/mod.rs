//! Growth-curve model implementations.
//!
//! Models are implemented as small, pure functions so that fitting and band
//! code can stay generic over `ModelKind`.

pub mod model;

pub use model::*;
