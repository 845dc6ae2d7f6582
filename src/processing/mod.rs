//! Track and reference-set input

pub mod gpx;
pub mod kml;
pub mod loader;
pub mod reference;

pub use kml::ParsedTrack;
pub use loader::{load_reference, TrackFormat, TrackLoader};
pub use reference::{parse_reference, ReferenceLayout, RouteFilter};
