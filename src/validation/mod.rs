//! Input sanitizing and error types

pub mod data;
pub mod error;

pub use data::{TrackValidator, ValidationConfig, ValidationIssue};
pub use error::{CorrelationError, LoadError};
