//! `wdi-curves` library crate.
//!
//! The binary (`wdi`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the stages (normalize, cluster, fit, band, reconcile) are reusable on
//!   their own

pub mod app;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod table;
