//! Table operations: selection, joins, filling and reconciliation.

pub mod ops;
pub mod reconcile;

pub use ops::*;
pub use reconcile::*;
