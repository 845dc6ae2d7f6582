//! File-level entry points: format dispatch, reading, sanitizing

use super::{gpx, kml, reference};
use crate::core::{default_utc_offset, Coordinate, Location, Position};
use crate::processing::reference::RouteFilter;
use crate::validation::data::TrackValidator;
use crate::validation::error::LoadError;
use chrono::FixedOffset;
use std::fs;
use std::path::Path;

/// Track file formats, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Kml,
    Kmz,
    Gpx,
}

impl TrackFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "kml" => Ok(TrackFormat::Kml),
            "kmz" => Ok(TrackFormat::Kmz),
            "gpx" => Ok(TrackFormat::Gpx),
            _ => Err(LoadError::UnsupportedFormat { extension }),
        }
    }
}

fn kml_text(format: TrackFormat, bytes: &[u8]) -> Result<String, LoadError> {
    match format {
        TrackFormat::Kmz => kml::read_kmz(bytes),
        _ => String::from_utf8(bytes.to_vec()).map_err(|e| LoadError::Xml {
            details: format!("document is not UTF-8: {}", e),
        }),
    }
}

/// Loads tracks and paths, expressing every timestamp in one offset
pub struct TrackLoader {
    offset: FixedOffset,
    path_folder: Option<String>,
    validator: TrackValidator,
}

impl TrackLoader {
    pub fn new(offset: FixedOffset) -> Self {
        Self {
            offset,
            path_folder: None,
            validator: TrackValidator::new(),
        }
    }

    /// Restrict KML paths to LineStrings inside the named folder
    pub fn with_path_folder(mut self, folder: Option<String>) -> Self {
        self.path_folder = folder;
        self
    }

    pub fn with_validator(mut self, validator: TrackValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Timed fixes from in-memory file contents, sorted and de-duplicated
    pub fn parse_positions(&self, format: TrackFormat, bytes: &[u8]) -> Result<Vec<Position>, LoadError> {
        let parsed = match format {
            TrackFormat::Gpx => gpx::parse_positions(bytes, &self.offset)?,
            TrackFormat::Kml | TrackFormat::Kmz => kml::parse_positions(&kml_text(format, bytes)?, &self.offset)?,
        };

        if parsed.skipped > 0 {
            log::warn!("{} unreadable records skipped", parsed.skipped);
        }

        Ok(self.validator.validate_positions(parsed.positions).positions)
    }

    /// Untimed path vertices from in-memory file contents
    pub fn parse_path(&self, format: TrackFormat, bytes: &[u8]) -> Result<Vec<Coordinate>, LoadError> {
        let path = match format {
            TrackFormat::Gpx => gpx::parse_path(bytes)?,
            TrackFormat::Kml | TrackFormat::Kmz => {
                kml::parse_path(&kml_text(format, bytes)?, self.path_folder.as_deref())?
            }
        };

        Ok(path
            .into_iter()
            .filter(|c| TrackValidator::check_coordinate(c).is_ok())
            .collect())
    }

    pub fn load_positions(&self, path: &Path) -> Result<Vec<Position>, LoadError> {
        let format = TrackFormat::from_path(path)?;
        let bytes = fs::read(path).map_err(|e| LoadError::from_io(path, e))?;
        log::info!("Loading track {}", path.display());
        self.parse_positions(format, &bytes)
    }

    pub fn load_path(&self, path: &Path) -> Result<Vec<Coordinate>, LoadError> {
        let format = TrackFormat::from_path(path)?;
        let bytes = fs::read(path).map_err(|e| LoadError::from_io(path, e))?;
        log::info!("Loading path {}", path.display());
        self.parse_path(format, &bytes)
    }
}

impl Default for TrackLoader {
    fn default() -> Self {
        Self::new(default_utc_offset())
    }
}

/// Read a reference CSV, dropping locations with unusable coordinates
pub fn load_reference(path: &Path, filter: RouteFilter) -> Result<Vec<Location>, LoadError> {
    let file = fs::File::open(path).map_err(|e| LoadError::from_io(path, e))?;
    log::info!("Loading reference set {}", path.display());
    let locations = reference::parse_reference(file, filter)?;
    Ok(TrackValidator::new().validate_locations(locations).locations)
}
