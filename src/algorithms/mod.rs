//! Correlation algorithms: distance, grouping, summaries, matching, divergence

pub mod geodesy;
pub mod grouping;
pub mod summary;
pub mod matcher;
pub mod divergence;

pub use geodesy::{distance, distance_between};
pub use grouping::{group_by_location, EmptyBucketMode, LocationBucket, ProximityGrouper, RadiusMatch};
pub use summary::{evaluate_alert, parse_alert_time, summarize, Summary, Verdict};
pub use matcher::{first_within, nearest, Match, MatchKind, MatchMode, TrackMatcher};
pub use divergence::{compare_tracks, DivergenceSegment, PairDivergence, TrackComparison};
