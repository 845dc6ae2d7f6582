//! Configuration

pub mod config;

pub use config::{validate_config, AnalysisConfig, ConfigError, ConfigurationManager};
