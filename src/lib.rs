//! Track Correlation
//!
//! Correlates timestamped GPS tracks with named reference locations:
//! groups fixes around places, derives arrival/departure times and judges
//! expected arrival alerts, matches places to their nearest or first nearby
//! fix, and measures point-by-point divergence between two tracks.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use self::core::{Coordinate, Geodetic, Location, Position, EARTH_RADIUS_M};
pub use algorithms::{
    compare_tracks, distance, evaluate_alert, first_within, group_by_location, nearest, summarize, EmptyBucketMode,
    Match, MatchKind, MatchMode, ProximityGrouper, RadiusMatch, Summary, TrackComparison, TrackMatcher, Verdict,
};
pub use processing::{load_reference, RouteFilter, TrackFormat, TrackLoader};
pub use validation::{CorrelationError, LoadError, TrackValidator};
pub use utils::{AnalysisConfig, ConfigError, ConfigurationManager};
pub use api::{OutputFormat, RouteMatch, TrackAnalyzer, VisitReport};
