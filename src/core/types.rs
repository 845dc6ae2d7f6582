//! Core data types shared by the parsers and the correlation engine

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Anything that sits at a latitude/longitude in decimal degrees
pub trait Geodetic {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;

    /// True when both components are finite numbers
    fn has_finite_coordinates(&self) -> bool {
        self.latitude().is_finite() && self.longitude().is_finite()
    }
}

/// Timestamped GPS fix from a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub timestamp: DateTime<FixedOffset>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(timestamp: DateTime<FixedOffset>, latitude: f64, longitude: f64) -> Self {
        Self { timestamp, latitude, longitude }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Named reference point, optionally carrying expected alert times ("HH:MM")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_arrival: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_departure: Option<String>,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            expected_arrival: None,
            expected_departure: None,
        }
    }

    pub fn with_expected_arrival(mut self, alert: impl Into<String>) -> Self {
        self.expected_arrival = Some(alert.into());
        self
    }

    pub fn with_expected_departure(mut self, alert: impl Into<String>) -> Self {
        self.expected_departure = Some(alert.into());
        self
    }
}

/// Untimed path vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl Geodetic for Position {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Geodetic for Location {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl Geodetic for Coordinate {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}
