//! Nearest and first-within-radius matching of a target against a track
//!
//! Two modes are offered. `nearest` scans the whole track and keeps the
//! globally closest fix (first occurrence wins ties). `first_within` walks the
//! track in time order and stops at the first fix inside the radius; when no
//! fix qualifies it falls back to the closest one seen. The result always says
//! which of the two happened, so callers never mistake a far-away fallback for
//! a hit.

use crate::algorithms::geodesy::distance_between;
use crate::core::{Geodetic, Position};
use crate::validation::error::CorrelationError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Matching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Nearest,
    FirstWithin,
}

/// How a match was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Globally closest fix (nearest mode)
    Nearest,
    /// Earliest fix inside the radius (first-within mode)
    WithinRadius,
    /// No fix inside the radius; closest fix returned instead
    NearestFallback,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Nearest => write!(f, "nearest"),
            MatchKind::WithinRadius => write!(f, "within radius"),
            MatchKind::NearestFallback => write!(f, "fallback"),
        }
    }
}

/// Matched fix together with its distance to the target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub distance_m: f64,
    pub position: Position,
    pub kind: MatchKind,
}

impl Match {
    pub fn is_within(&self, radius_m: f64) -> bool {
        self.distance_m <= radius_m
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == MatchKind::NearestFallback
    }
}

fn check_coordinates<T: Geodetic>(item: &T, what: &str) -> Result<(), CorrelationError> {
    if item.has_finite_coordinates() {
        Ok(())
    } else {
        Err(CorrelationError::InvalidCoordinate {
            context: what.to_string(),
            latitude: item.latitude(),
            longitude: item.longitude(),
        })
    }
}

fn check_track(points: &[Position]) -> Result<(), CorrelationError> {
    for (index, point) in points.iter().enumerate() {
        check_coordinates(point, &format!("track point {}", index))?;
    }
    Ok(())
}

/// Globally nearest fix to `target`; `Ok(None)` for an empty track
pub fn nearest<T: Geodetic>(target: &T, points: &[Position]) -> Result<Option<Match>, CorrelationError> {
    check_coordinates(target, "target")?;
    check_track(points)?;

    let mut best: Option<(f64, &Position)> = None;
    for point in points {
        let d = distance_between(target, point);
        match best {
            Some((best_distance, _)) if d >= best_distance => {}
            _ => best = Some((d, point)),
        }
    }

    Ok(best.map(|(distance_m, position)| Match {
        distance_m,
        position: position.clone(),
        kind: MatchKind::Nearest,
    }))
}

/// Earliest fix within `radius_m` of `target`, falling back to the nearest fix
pub fn first_within<T: Geodetic>(
    target: &T,
    points: &[Position],
    radius_m: f64,
) -> Result<Option<Match>, CorrelationError> {
    check_coordinates(target, "target")?;
    check_track(points)?;

    let in_time_order = points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp);
    let ordered: Cow<'_, [Position]> = if in_time_order {
        Cow::Borrowed(points)
    } else {
        let mut sorted = points.to_vec();
        sorted.sort_by_key(|p| p.timestamp);
        Cow::Owned(sorted)
    };

    let mut best: Option<(f64, &Position)> = None;
    for point in ordered.iter() {
        let d = distance_between(target, point);
        if d <= radius_m {
            return Ok(Some(Match {
                distance_m: d,
                position: point.clone(),
                kind: MatchKind::WithinRadius,
            }));
        }
        match best {
            Some((best_distance, _)) if d >= best_distance => {}
            _ => best = Some((d, point)),
        }
    }

    Ok(best.map(|(distance_m, position)| Match {
        distance_m,
        position: position.clone(),
        kind: MatchKind::NearestFallback,
    }))
}

/// Matcher bound to a mode and radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackMatcher {
    pub mode: MatchMode,
    pub radius_m: f64,
}

impl TrackMatcher {
    pub fn new(mode: MatchMode, radius_m: f64) -> Self {
        Self { mode, radius_m }
    }

    pub fn find<T: Geodetic>(&self, target: &T, points: &[Position]) -> Result<Option<Match>, CorrelationError> {
        match self.mode {
            MatchMode::Nearest => nearest(target, points),
            MatchMode::FirstWithin => first_within(target, points, self.radius_m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesy::meters_to_latitude_degrees;
    use crate::core::{Coordinate, Location};
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn ts(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, hour, minute, 0)
            .unwrap()
    }

    fn fix_at(meters_north: f64, time: DateTime<FixedOffset>) -> Position {
        Position::new(time, 37.5 + meters_to_latitude_degrees(meters_north), 127.0)
    }

    fn target() -> Location {
        Location::new("Stop", 37.5, 127.0)
    }

    #[test]
    fn test_nearest_on_empty_track_is_absent() {
        assert_eq!(nearest(&target(), &[]).unwrap(), None);
        assert_eq!(first_within(&target(), &[], 150.0).unwrap(), None);
    }

    #[test]
    fn test_nearest_picks_global_minimum() {
        let points = vec![fix_at(400.0, ts(9, 0)), fix_at(30.0, ts(9, 5)), fix_at(90.0, ts(9, 10))];

        let found = nearest(&target(), &points).unwrap().unwrap();

        assert_eq!(found.position, points[1]);
        assert_eq!(found.kind, MatchKind::Nearest);
        assert!((found.distance_m - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_ties_resolve_to_first_occurrence() {
        let points = vec![fix_at(50.0, ts(9, 0)), fix_at(80.0, ts(9, 5)), fix_at(50.0, ts(9, 10))];

        let found = nearest(&target(), &points).unwrap().unwrap();

        assert_eq!(found.position.timestamp, ts(9, 0));
    }

    #[test]
    fn test_first_within_returns_earliest_hit_not_closest() {
        let points = vec![fix_at(400.0, ts(9, 0)), fix_at(140.0, ts(9, 5)), fix_at(5.0, ts(9, 10))];

        let found = first_within(&target(), &points, 150.0).unwrap().unwrap();

        assert_eq!(found.kind, MatchKind::WithinRadius);
        assert_eq!(found.position.timestamp, ts(9, 5));
        assert!(found.is_within(150.0));
    }

    #[test]
    fn test_first_within_falls_back_to_nearest() {
        let points = vec![fix_at(900.0, ts(9, 0)), fix_at(300.0, ts(9, 5)), fix_at(600.0, ts(9, 10))];

        let found = first_within(&target(), &points, 150.0).unwrap().unwrap();

        assert_eq!(found.kind, MatchKind::NearestFallback);
        assert!(found.is_fallback());
        assert_eq!(found.position.timestamp, ts(9, 5));
        assert!(!found.is_within(150.0));
    }

    #[test]
    fn test_first_within_scans_in_time_order() {
        let points = vec![fix_at(100.0, ts(9, 30)), fix_at(120.0, ts(9, 0))];

        let found = first_within(&target(), &points, 150.0).unwrap().unwrap();

        assert_eq!(found.position.timestamp, ts(9, 0));
        // Input left untouched
        assert_eq!(points[0].timestamp, ts(9, 30));
    }

    #[test]
    fn test_radius_boundary_counts_as_within() {
        let point = fix_at(150.0, ts(9, 0));
        let exact = distance_between(&target(), &point);

        let found = first_within(&target(), &[point], exact).unwrap().unwrap();

        assert_eq!(found.kind, MatchKind::WithinRadius);
    }

    #[test]
    fn test_nan_target_is_rejected() {
        let bad = Coordinate::new(f64::NAN, 127.0);
        let points = vec![fix_at(10.0, ts(9, 0))];

        let err = nearest(&bad, &points).unwrap_err();

        assert!(matches!(err, CorrelationError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_nan_track_point_is_rejected() {
        let points = vec![fix_at(10.0, ts(9, 0)), Position::new(ts(9, 1), 37.5, f64::INFINITY)];

        let err = first_within(&target(), &points, 150.0).unwrap_err();

        match err {
            CorrelationError::InvalidCoordinate { context, .. } => assert_eq!(context, "track point 1"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_track_matcher_dispatches_on_mode() {
        let points = vec![fix_at(140.0, ts(9, 0)), fix_at(10.0, ts(9, 5))];

        let nearest_hit = TrackMatcher::new(MatchMode::Nearest, 150.0).find(&target(), &points).unwrap().unwrap();
        let first_hit = TrackMatcher::new(MatchMode::FirstWithin, 150.0).find(&target(), &points).unwrap().unwrap();

        assert_eq!(nearest_hit.position.timestamp, ts(9, 5));
        assert_eq!(first_hit.position.timestamp, ts(9, 0));
    }
}
