//! Plot data and its text rendering.
//!
//! The analysis only produces plot *data* (`data`); turning it into a picture
//! is the job of a `Renderer`. `AsciiRenderer` is the built-in one.

pub mod ascii;
pub mod data;

pub use ascii::*;
pub use data::*;
