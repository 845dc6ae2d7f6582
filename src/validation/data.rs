use crate::algorithms::geodesy::distance_between;
use crate::core::{Geodetic, Location, Position};
use thiserror::Error;

/// Configuration for track sanitizing
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Drop fixes repeating the previous fix's timestamp and coordinate
    pub remove_duplicates: bool,
    /// Distance between consecutive fixes that is reported as a jump (meters)
    pub max_position_jump_m: Option<f64>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            remove_duplicates: true,
            max_position_jump_m: Some(10_000.0), // 10 km between consecutive fixes
        }
    }
}

/// Problems found while sanitizing parsed input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
    #[error("Non-finite coordinate ({latitude}, {longitude})")]
    NonFiniteCoordinate { latitude: f64, longitude: f64 },

    #[error("Latitude out of range: {latitude}")]
    LatitudeOutOfRange { latitude: f64 },

    #[error("Longitude out of range: {longitude}")]
    LongitudeOutOfRange { longitude: f64 },

    #[error("Track was not in chronological order; {moved} fixes reordered")]
    OutOfOrder { moved: usize },

    #[error("{count} duplicate fixes removed")]
    DuplicatesRemoved { count: usize },

    #[error("Position jump of {distance_m:.1} m before fix {index}")]
    PositionJump { index: usize, distance_m: f64 },
}

/// Sanitized track plus everything that was dropped or noticed on the way
#[derive(Debug, Clone)]
pub struct TrackValidation {
    pub positions: Vec<Position>,
    pub warnings: Vec<ValidationIssue>,
    pub rejected: Vec<(Position, ValidationIssue)>,
}

/// Sanitized reference set
#[derive(Debug, Clone)]
pub struct LocationValidation {
    pub locations: Vec<Location>,
    pub rejected: Vec<(Location, ValidationIssue)>,
}

/// Brings parsed tracks into the shape the correlation core relies on:
/// finite in-range coordinates, ascending timestamps, no exact duplicates.
pub struct TrackValidator {
    config: ValidationConfig,
}

impl TrackValidator {
    pub fn new() -> Self {
        Self {
            config: ValidationConfig::default(),
        }
    }

    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Check a single coordinate pair
    pub fn check_coordinate<T: Geodetic>(item: &T) -> Result<(), ValidationIssue> {
        let (latitude, longitude) = (item.latitude(), item.longitude());
        if !item.has_finite_coordinates() {
            return Err(ValidationIssue::NonFiniteCoordinate { latitude, longitude });
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationIssue::LatitudeOutOfRange { latitude });
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationIssue::LongitudeOutOfRange { longitude });
        }
        Ok(())
    }

    /// Sanitize a parsed track
    pub fn validate_positions(&self, positions: Vec<Position>) -> TrackValidation {
        let mut warnings = Vec::new();
        let mut rejected = Vec::new();
        let mut valid = Vec::with_capacity(positions.len());

        for position in positions {
            match Self::check_coordinate(&position) {
                Ok(()) => valid.push(position),
                Err(issue) => {
                    log::warn!("Rejected fix at {}: {}", position.timestamp, issue);
                    rejected.push((position, issue));
                }
            }
        }

        let moved = valid
            .windows(2)
            .filter(|w| w[1].timestamp < w[0].timestamp)
            .count();
        if moved > 0 {
            valid.sort_by_key(|position| position.timestamp);
            warnings.push(ValidationIssue::OutOfOrder { moved });
        }

        if self.config.remove_duplicates {
            // Equal fixes must be adjacent for dedup, so order same-time fixes by coordinate
            valid.sort_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then(a.latitude.total_cmp(&b.latitude))
                    .then(a.longitude.total_cmp(&b.longitude))
            });
            let before = valid.len();
            valid.dedup();
            let count = before - valid.len();
            if count > 0 {
                warnings.push(ValidationIssue::DuplicatesRemoved { count });
            }
        }

        if let Some(max_jump) = self.config.max_position_jump_m {
            for (index, pair) in valid.windows(2).enumerate() {
                let distance_m = distance_between(&pair[0], &pair[1]);
                if distance_m > max_jump {
                    warnings.push(ValidationIssue::PositionJump {
                        index: index + 1,
                        distance_m,
                    });
                }
            }
        }

        for warning in &warnings {
            log::debug!("Track validation: {}", warning);
        }

        TrackValidation {
            positions: valid,
            warnings,
            rejected,
        }
    }

    /// Drop reference locations with unusable coordinates
    pub fn validate_locations(&self, locations: Vec<Location>) -> LocationValidation {
        let mut valid = Vec::with_capacity(locations.len());
        let mut rejected = Vec::new();

        for location in locations {
            match Self::check_coordinate(&location) {
                Ok(()) => valid.push(location),
                Err(issue) => {
                    log::warn!("Rejected location '{}': {}", location.name, issue);
                    rejected.push((location, issue));
                }
            }
        }

        LocationValidation {
            locations: valid,
            rejected,
        }
    }
}

impl Default for TrackValidator {
    fn default() -> Self {
        Self::new()
    }
}
