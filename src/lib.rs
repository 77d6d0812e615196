//! pitchcast library crate
//!
//! Exposes the commentary pipeline so the CLI, benchmarks and embedding
//! services share one implementation.

pub mod commentary;
pub mod config;
pub mod error;

pub use error::{CommentaryError, Result};
