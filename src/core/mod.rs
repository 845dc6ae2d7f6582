//! Core types and constants for track correlation

pub mod types;
pub mod constants;

pub use types::*;
pub use constants::*;
