//! High-level analyses combining loaders, grouping, summaries and matching

use crate::algorithms::divergence::{compare_tracks, TrackComparison};
use crate::algorithms::grouping::{EmptyBucketMode, RadiusMatch};
use crate::algorithms::matcher::{Match, MatchKind};
use crate::algorithms::summary::{summarize, Summary, Verdict};
use crate::core::{Coordinate, Location, Position};
use crate::utils::config::{validate_config, AnalysisConfig, ConfigError};
use crate::validation::error::CorrelationError;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Grouping plus per-location summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitReport {
    pub radius_m: f64,
    pub matches: RadiusMatch,
    pub summaries: Vec<Summary>,
}

impl VisitReport {
    /// Summaries whose expected alert fired inside the pass window
    pub fn passed(&self) -> usize {
        self.summaries.iter().filter(|s| s.verdict == Verdict::Pass).count()
    }
}

/// Track fix matched to one reference location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMatch {
    pub place: String,
    pub expected_arrival: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<FixedOffset>,
    pub distance_m: f64,
    pub kind: MatchKind,
}

impl RouteMatch {
    fn from_match(location: &Location, found: Match) -> Self {
        Self {
            place: location.name.clone(),
            expected_arrival: location.expected_arrival.clone(),
            latitude: found.position.latitude,
            longitude: found.position.longitude,
            timestamp: found.position.timestamp,
            distance_m: found.distance_m,
            kind: found.kind,
        }
    }
}

/// Runs every analysis with one validated configuration
#[derive(Debug, Clone)]
pub struct TrackAnalyzer {
    config: AnalysisConfig,
}

impl TrackAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        validate_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Group fixes per place, keeping places without fixes
    pub fn positions_by_place(&self, positions: &[Position], locations: &[Location]) -> RadiusMatch {
        self.config
            .grouper()
            .with_empty_buckets(EmptyBucketMode::Keep)
            .group(positions, locations)
    }

    /// Group fixes per place and summarize each visited place
    pub fn visits(&self, positions: &[Position], locations: &[Location]) -> VisitReport {
        let matches = self.config.grouper().group(positions, locations);
        let summaries = summarize(&matches);
        log::info!(
            "{} of {} places visited within {} m",
            summaries.len(),
            locations.len(),
            self.config.grouping_radius_m
        );

        VisitReport {
            radius_m: self.config.grouping_radius_m,
            matches,
            summaries,
        }
    }

    /// Match each reference location to a track fix.
    ///
    /// Locations yield nothing only when the track is empty.
    pub fn compare_route(
        &self,
        positions: &[Position],
        locations: &[Location],
    ) -> Result<Vec<RouteMatch>, CorrelationError> {
        let matcher = self.config.matcher();
        let mut rows = Vec::with_capacity(locations.len());

        for location in locations {
            if let Some(found) = matcher.find(location, positions)? {
                if found.is_fallback() {
                    log::warn!(
                        "No fix within {} m of '{}'; nearest is {:.1} m away",
                        matcher.radius_m,
                        location.name,
                        found.distance_m
                    );
                }
                rows.push(RouteMatch::from_match(location, found));
            }
        }

        Ok(rows)
    }

    /// Index-aligned divergence of `test` from `base` at the comparison radius
    pub fn compare_tracks(&self, base: &[Coordinate], test: &[Coordinate]) -> TrackComparison {
        let comparison = compare_tracks(base, test, self.config.compare_radius_m);
        log::info!(
            "{} of {} paired vertices diverge beyond {} m",
            comparison.diverged_count,
            comparison.pairs.len(),
            comparison.threshold_m
        );
        comparison
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesy::meters_to_latitude_degrees;
    use crate::algorithms::matcher::MatchMode;
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, hour, minute, 0)
            .unwrap()
    }

    fn north_of(base: &Location, meters: f64, time: DateTime<FixedOffset>) -> Position {
        Position::new(time, base.latitude + meters_to_latitude_degrees(meters), base.longitude)
    }

    fn places() -> Vec<Location> {
        vec![
            Location::new("Depot", 37.5, 127.0).with_expected_arrival("09:06"),
            Location::new("Harbor", 37.6, 127.1).with_expected_arrival("10:00"),
            Location::new("Unvisited", 36.0, 128.0),
        ]
    }

    fn track(places: &[Location]) -> Vec<Position> {
        vec![
            north_of(&places[0], 10.0, ts(9, 5)),
            north_of(&places[0], 20.0, ts(9, 15)),
            north_of(&places[1], 200.0, ts(9, 59)),
            north_of(&places[1], 0.0, ts(10, 3)),
        ]
    }

    #[test]
    fn test_visits_summarize_and_judge() {
        let places = places();
        let analyzer = TrackAnalyzer::new(AnalysisConfig::default()).unwrap();

        let report = analyzer.visits(&track(&places), &places);

        assert_eq!(report.matches.len(), 2);
        assert_eq!(report.summaries.len(), 2);
        let depot = &report.summaries[0];
        assert_eq!(depot.location_name, "Depot");
        assert_eq!(depot.arrival, ts(9, 5));
        assert_eq!(depot.departure, ts(9, 15));
        assert_eq!(depot.deviation_minutes, Some(1.0));
        assert_eq!(depot.verdict, Verdict::Pass);
        let harbor = &report.summaries[1];
        assert_eq!(harbor.arrival, ts(9, 59));
        assert_eq!(harbor.verdict, Verdict::Pass);
        assert_eq!(report.passed(), 2);
    }

    #[test]
    fn test_positions_by_place_keeps_empty_places() {
        let places = places();
        let analyzer = TrackAnalyzer::new(AnalysisConfig::default()).unwrap();

        let grouped = analyzer.positions_by_place(&track(&places), &places);

        assert_eq!(grouped.len(), 3);
        assert!(grouped.get("Unvisited").unwrap().is_empty());
        assert_eq!(grouped.positions_for("Harbor").len(), 2);
    }

    #[test]
    fn test_compare_route_nearest() {
        let places = places();
        let analyzer = TrackAnalyzer::new(AnalysisConfig::default()).unwrap();

        let rows = analyzer.compare_route(&track(&places), &places).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].place, "Depot");
        assert_eq!(rows[0].timestamp, ts(9, 5));
        assert_eq!(rows[0].kind, MatchKind::Nearest);
        assert_eq!(rows[0].expected_arrival.as_deref(), Some("09:06"));
        assert_eq!(rows[1].timestamp, ts(10, 3));
        assert!(rows[1].distance_m < 1.0);
    }

    #[test]
    fn test_compare_route_first_within() {
        let places = places();
        let config = AnalysisConfig {
            match_mode: MatchMode::FirstWithin,
            compare_radius_m: 300.0,
            ..AnalysisConfig::default()
        };
        let analyzer = TrackAnalyzer::new(config).unwrap();

        let rows = analyzer.compare_route(&track(&places), &places).unwrap();

        assert_eq!(rows[1].place, "Harbor");
        assert_eq!(rows[1].timestamp, ts(9, 59));
        assert_eq!(rows[1].kind, MatchKind::WithinRadius);
        assert_eq!(rows[2].place, "Unvisited");
        assert_eq!(rows[2].kind, MatchKind::NearestFallback);
    }

    #[test]
    fn test_compare_route_empty_track() {
        let analyzer = TrackAnalyzer::new(AnalysisConfig::default()).unwrap();
        assert!(analyzer.compare_route(&[], &places()).unwrap().is_empty());
    }

    #[test]
    fn test_compare_tracks_uses_compare_radius() {
        let config = AnalysisConfig {
            compare_radius_m: 50.0,
            ..AnalysisConfig::default()
        };
        let analyzer = TrackAnalyzer::new(config).unwrap();
        let base = vec![Coordinate::new(37.5, 127.0), Coordinate::new(37.501, 127.0)];
        let test = vec![
            Coordinate::new(37.5 + meters_to_latitude_degrees(10.0), 127.0),
            Coordinate::new(37.501 + meters_to_latitude_degrees(100.0), 127.0),
        ];

        let comparison = analyzer.compare_tracks(&base, &test);

        assert_eq!(comparison.threshold_m, 50.0);
        assert_eq!(comparison.mask(), vec![false, true]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            compare_radius_m: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(TrackAnalyzer::new(config).is_err());
    }
}
