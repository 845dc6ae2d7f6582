//! Error taxonomy for the correlation core and its input loaders

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the correlation core itself.
///
/// Degenerate input (empty tracks, empty reference sets) is not an error; it
/// yields empty or absent results instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrelationError {
    #[error("Malformed alert time {value:?}: expected HH:MM")]
    MalformedAlertTime { value: String },

    #[error("Invalid coordinate for {context}: ({latitude}, {longitude})")]
    InvalidCoordinate {
        context: String,
        latitude: f64,
        longitude: f64,
    },
}

/// Errors raised while reading tracks and reference sets from disk
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed XML: {details}")]
    Xml { details: String },

    #[error("Archive error: {details}")]
    Archive { details: String },

    #[error("Malformed CSV: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("Malformed GPX: {details}")]
    Gpx { details: String },

    #[error("Unsupported track format '{extension}' (expected kml, kmz or gpx)")]
    UnsupportedFormat { extension: String },

    #[error("Reference file is missing column '{column}'")]
    MissingColumn { column: String },
}

impl LoadError {
    /// Map an I/O failure on `path`, singling out missing files
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::FileNotFound { path }
        } else {
            LoadError::Io { path, source }
        }
    }
}

impl From<quick_xml::Error> for LoadError {
    fn from(e: quick_xml::Error) -> Self {
        LoadError::Xml { details: e.to_string() }
    }
}

impl From<zip::result::ZipError> for LoadError {
    fn from(e: zip::result::ZipError) -> Self {
        LoadError::Archive { details: e.to_string() }
    }
}

impl From<gpx::errors::GpxError> for LoadError {
    fn from(e: gpx::errors::GpxError) -> Self {
        LoadError::Gpx { details: e.to_string() }
    }
}
