//! GPX track extraction

use crate::core::{Coordinate, Position};
use crate::processing::kml::ParsedTrack;
use crate::validation::error::LoadError;
use chrono::{DateTime, FixedOffset};
use std::io::Read;

fn waypoint_time(
    point: &::gpx::Waypoint,
    offset: &FixedOffset,
) -> Result<Option<DateTime<FixedOffset>>, LoadError> {
    let Some(time) = point.time.as_ref() else {
        return Ok(None);
    };
    let iso = time.format().map_err(|e| LoadError::Gpx { details: e.to_string() })?;
    Ok(DateTime::parse_from_rfc3339(&iso)
        .ok()
        .map(|parsed| parsed.with_timezone(offset)))
}

/// Timed fixes from every track segment, converted to `offset`.
///
/// Points without a time are not fixes and are counted as skipped.
pub fn parse_positions<R: Read>(reader: R, offset: &FixedOffset) -> Result<ParsedTrack, LoadError> {
    let document = ::gpx::read(reader)?;
    let mut track = ParsedTrack::default();

    for point in document
        .tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .flat_map(|s| s.points.iter())
    {
        match waypoint_time(point, offset)? {
            Some(timestamp) => {
                let geo = point.point();
                track.positions.push(Position::new(timestamp, geo.y(), geo.x()));
            }
            None => track.skipped += 1,
        }
    }

    if track.skipped > 0 {
        log::warn!("GPX: skipped {} track points without a time", track.skipped);
    }
    log::debug!("GPX: {} fixes parsed", track.positions.len());
    Ok(track)
}

/// Path vertices: track points first, then route points, both in document order
pub fn parse_path<R: Read>(reader: R) -> Result<Vec<Coordinate>, LoadError> {
    let document = ::gpx::read(reader)?;

    let track_points = document
        .tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .flat_map(|s| s.points.iter());
    let route_points = document.routes.iter().flat_map(|r| r.points.iter());

    Ok(track_points
        .chain(route_points)
        .map(|point| {
            let geo = point.point();
            Coordinate::new(geo.y(), geo.x())
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TRACK_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="tests" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>commute</name>
    <trkseg>
      <trkpt lat="37.5" lon="127.0"><time>2024-05-01T00:05:00Z</time></trkpt>
      <trkpt lat="37.501" lon="127.001"></trkpt>
      <trkpt lat="37.502" lon="127.002"><time>2024-05-01T00:07:00Z</time></trkpt>
    </trkseg>
  </trk>
  <rte>
    <rtept lat="37.6" lon="127.1"></rtept>
  </rte>
</gpx>"#;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_parse_positions_skips_untimed_points() {
        let track = parse_positions(TRACK_GPX.as_bytes(), &kst()).unwrap();

        assert_eq!(track.positions.len(), 2);
        assert_eq!(track.skipped, 1);
        assert_eq!(
            track.positions[0].timestamp,
            kst().with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap()
        );
        assert_eq!(track.positions[1].latitude, 37.502);
        assert_eq!(track.positions[1].longitude, 127.002);
    }

    #[test]
    fn test_parse_path_includes_routes() {
        let path = parse_path(TRACK_GPX.as_bytes()).unwrap();

        assert_eq!(path.len(), 4);
        assert_eq!(path[3], Coordinate::new(37.6, 127.1));
    }

    #[test]
    fn test_garbage_is_a_gpx_error() {
        let err = parse_positions("not xml at all".as_bytes(), &kst()).unwrap_err();
        assert!(matches!(err, LoadError::Gpx { .. }));
    }
}
