use crate::algorithms::grouping::{EmptyBucketMode, ProximityGrouper};
use crate::algorithms::matcher::{MatchMode, TrackMatcher};
use crate::core::{
    utc_offset_from_minutes, DEFAULT_COMPARE_RADIUS_M, DEFAULT_GROUPING_RADIUS_M, DEFAULT_UTC_OFFSET_MINUTES,
};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Analysis parameters shared by every command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Radius for grouping fixes around reference locations (meters)
    pub grouping_radius_m: f64,
    /// Radius for route matching and track divergence (meters)
    pub compare_radius_m: f64,
    /// Offset all timestamps are expressed in (minutes east of UTC)
    pub utc_offset_minutes: i32,
    /// Whether locations without fixes are reported
    pub empty_buckets: EmptyBucketMode,
    /// Route comparison strategy
    pub match_mode: MatchMode,
    /// KML folder holding the reference path, if paths are folder-scoped
    pub path_folder: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            grouping_radius_m: DEFAULT_GROUPING_RADIUS_M,
            compare_radius_m: DEFAULT_COMPARE_RADIUS_M,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            empty_buckets: EmptyBucketMode::Drop,
            match_mode: MatchMode::Nearest,
            path_folder: None,
        }
    }
}

impl AnalysisConfig {
    /// Offset as a chrono value; only meaningful on a validated config
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        utc_offset_from_minutes(self.utc_offset_minutes).ok_or_else(|| ConfigError::InvalidParameter {
            parameter: "utc_offset_minutes".to_string(),
            value: self.utc_offset_minutes.to_string(),
            reason: "Offset must be less than 24 hours".to_string(),
        })
    }

    pub fn grouper(&self) -> ProximityGrouper {
        ProximityGrouper::new(self.grouping_radius_m).with_empty_buckets(self.empty_buckets)
    }

    pub fn matcher(&self) -> TrackMatcher {
        TrackMatcher::new(self.match_mode, self.compare_radius_m)
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid {parameter} = {value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("{message}")]
    IoError { message: String },

    #[error("{message}")]
    SerializationError { message: String },
}

fn check_radius(parameter: &str, radius_m: f64) -> Result<(), ConfigError> {
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: radius_m.to_string(),
            reason: "Radius must be a positive number of meters".to_string(),
        });
    }
    Ok(())
}

/// Check every field of `config`
pub fn validate_config(config: &AnalysisConfig) -> Result<(), ConfigError> {
    check_radius("grouping_radius_m", config.grouping_radius_m)?;
    check_radius("compare_radius_m", config.compare_radius_m)?;
    config.utc_offset()?;
    Ok(())
}

/// Owns the active configuration and the file it came from
pub struct ConfigurationManager {
    config: AnalysisConfig,
    config_file_path: Option<PathBuf>,
    is_modified: bool,
}

impl ConfigurationManager {
    /// Create a manager holding the defaults
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            config_file_path: None,
            is_modified: false,
        }
    }

    /// Create a manager and load `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn get_config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Replace the whole configuration after validating it
    pub fn update_config(&mut self, config: AnalysisConfig) -> Result<(), ConfigError> {
        validate_config(&config)?;
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let config: AnalysisConfig = serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse config file '{}': {}", path.display(), e),
        })?;

        validate_config(&config)?;

        log::debug!("Loaded configuration from {}", path.display());
        self.config = config;
        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(&self.config).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path.display(), e),
        })?;

        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Save to the file the configuration was last loaded from or saved to
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::IoError {
                message: "No file path set for saving configuration".to_string(),
            }),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    // Runtime parameter adjustment. Each setter returns the previous value.

    pub fn set_grouping_radius(&mut self, radius_m: f64) -> Result<f64, ConfigError> {
        check_radius("grouping_radius_m", radius_m)?;
        let old_value = std::mem::replace(&mut self.config.grouping_radius_m, radius_m);
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_compare_radius(&mut self, radius_m: f64) -> Result<f64, ConfigError> {
        check_radius("compare_radius_m", radius_m)?;
        let old_value = std::mem::replace(&mut self.config.compare_radius_m, radius_m);
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_utc_offset_minutes(&mut self, minutes: i32) -> Result<i32, ConfigError> {
        if utc_offset_from_minutes(minutes).is_none() {
            return Err(ConfigError::InvalidParameter {
                parameter: "utc_offset_minutes".to_string(),
                value: minutes.to_string(),
                reason: "Offset must be less than 24 hours".to_string(),
            });
        }
        let old_value = std::mem::replace(&mut self.config.utc_offset_minutes, minutes);
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn set_empty_buckets(&mut self, mode: EmptyBucketMode) -> EmptyBucketMode {
        self.is_modified = true;
        std::mem::replace(&mut self.config.empty_buckets, mode)
    }

    pub fn set_match_mode(&mut self, mode: MatchMode) -> MatchMode {
        self.is_modified = true;
        std::mem::replace(&mut self.config.match_mode, mode)
    }

    pub fn set_path_folder(&mut self, folder: Option<String>) -> Option<String> {
        self.is_modified = true;
        std::mem::replace(&mut self.config.path_folder, folder)
    }
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.grouping_radius_m, 300.0);
        assert_eq!(config.compare_radius_m, 150.0);
        assert_eq!(config.utc_offset_minutes, 540);
        assert_eq!(config.empty_buckets, EmptyBucketMode::Drop);
        assert_eq!(config.match_mode, MatchMode::Nearest);
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 9 * 3600);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_configuration_manager_creation() {
        let manager = ConfigurationManager::new();
        assert_eq!(manager.get_config(), &AnalysisConfig::default());
        assert!(!manager.is_modified());
    }

    #[test]
    fn test_setters_validate_and_return_old_value() {
        let mut manager = ConfigurationManager::new();

        assert_eq!(manager.set_grouping_radius(500.0).unwrap(), 300.0);
        assert!(manager.is_modified());
        assert!(manager.set_grouping_radius(0.0).is_err());
        assert!(manager.set_compare_radius(f64::NAN).is_err());
        assert!(manager.set_compare_radius(-1.0).is_err());
        assert_eq!(manager.get_config().grouping_radius_m, 500.0);

        assert_eq!(manager.set_utc_offset_minutes(0).unwrap(), 540);
        assert!(manager.set_utc_offset_minutes(24 * 60).is_err());
        assert_eq!(manager.get_config().utc_offset_minutes, 0);

        assert_eq!(manager.set_match_mode(MatchMode::FirstWithin), MatchMode::Nearest);
        assert_eq!(manager.set_empty_buckets(EmptyBucketMode::Keep), EmptyBucketMode::Drop);
        assert_eq!(manager.set_path_folder(Some("course".to_string())), None);
    }

    #[test]
    fn test_update_config_rejects_invalid() {
        let mut manager = ConfigurationManager::new();
        let config = AnalysisConfig {
            grouping_radius_m: -5.0,
            ..AnalysisConfig::default()
        };

        let err = manager.update_config(config).unwrap_err();

        assert!(matches!(err, ConfigError::InvalidParameter { ref parameter, .. } if parameter == "grouping_radius_m"));
        assert!(!manager.is_modified());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.json");

        let mut manager = ConfigurationManager::new();
        manager.set_compare_radius(75.0).unwrap();
        manager.set_match_mode(MatchMode::FirstWithin);
        manager.save_to_file(&path).unwrap();
        assert!(!manager.is_modified());

        let loaded = ConfigurationManager::from_file(&path).unwrap();
        assert_eq!(loaded.get_config(), manager.get_config());
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "grouping_radius_m": 120.0, "empty_buckets": "keep" }"#).unwrap();

        let manager = ConfigurationManager::from_file(&path).unwrap();

        assert_eq!(manager.get_config().grouping_radius_m, 120.0);
        assert_eq!(manager.get_config().empty_buckets, EmptyBucketMode::Keep);
        assert_eq!(manager.get_config().compare_radius_m, 150.0);
    }

    #[test]
    fn test_invalid_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ConfigurationManager::from_file(&path),
            Err(ConfigError::SerializationError { .. })
        ));

        fs::write(&path, r#"{ "utc_offset_minutes": 5000 }"#).unwrap();
        assert!(matches!(
            ConfigurationManager::from_file(&path),
            Err(ConfigError::InvalidParameter { .. })
        ));

        assert!(matches!(
            ConfigurationManager::from_file(dir.path().join("missing.json")),
            Err(ConfigError::IoError { .. })
        ));
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut manager = ConfigurationManager::new();
        assert!(matches!(manager.save(), Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn test_builders_follow_config() {
        let config = AnalysisConfig {
            grouping_radius_m: 80.0,
            compare_radius_m: 40.0,
            empty_buckets: EmptyBucketMode::Keep,
            match_mode: MatchMode::FirstWithin,
            ..AnalysisConfig::default()
        };

        let grouper = config.grouper();
        assert_eq!(grouper.radius_m(), 80.0);
        assert_eq!(grouper.empty_buckets(), EmptyBucketMode::Keep);
        assert_eq!(config.matcher(), TrackMatcher::new(MatchMode::FirstWithin, 40.0));
    }
}
