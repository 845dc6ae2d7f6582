//! KML track and path extraction
//!
//! Two shapes of data are read from a KML document:
//! - timed fixes: `Placemark` elements carrying `TimeStamp/when` and
//!   `Point/coordinates`
//! - untimed paths: `LineString/coordinates`, optionally restricted to
//!   LineStrings nested in a `Folder` with a given name
//!
//! Namespaces are ignored; elements are matched on their local names.

use crate::core::{Coordinate, Position};
use crate::validation::error::LoadError;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};

/// Raw placemark fields before conversion
#[derive(Debug, Clone, Default, PartialEq)]
struct PlacemarkDraft {
    when: Option<String>,
    coordinates: Option<String>,
}

/// LineString coordinate text with the names of its enclosing folders
#[derive(Debug, Clone, PartialEq)]
struct LineDraft {
    folders: Vec<String>,
    coordinates: String,
}

#[derive(Debug, Default)]
struct KmlDocument {
    placemarks: Vec<PlacemarkDraft>,
    lines: Vec<LineDraft>,
}

/// Fixes extracted from a track file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTrack {
    pub positions: Vec<Position>,
    /// Placemarks that carried a time or point but could not be converted
    pub skipped: usize,
}

/// Parse a `lon,lat[,alt]` tuple
pub fn parse_coordinate_tuple(tuple: &str) -> Option<Coordinate> {
    let mut parts = tuple.trim().split(',');
    let longitude = parts.next()?.trim().parse::<f64>().ok()?;
    let latitude = parts.next()?.trim().parse::<f64>().ok()?;
    Some(Coordinate::new(latitude, longitude))
}

/// Parse whitespace-separated coordinate tuples, skipping malformed ones
pub fn parse_coordinate_list(text: &str) -> Vec<Coordinate> {
    text.split_whitespace()
        .filter_map(|tuple| {
            let parsed = parse_coordinate_tuple(tuple);
            if parsed.is_none() {
                log::warn!("Skipping malformed coordinate tuple {:?}", tuple);
            }
            parsed
        })
        .collect()
}

/// Parse a KML `when` value and express it in `offset`.
///
/// RFC 3339 values (`Z` or numeric offset) are converted; values without a
/// zone are taken as UTC.
pub fn parse_when(when: &str, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let when = when.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(when) {
        return Some(parsed.with_timezone(offset));
    }
    NaiveDateTime::parse_from_str(when, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().with_timezone(offset))
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn scan_document(text: &str) -> Result<KmlDocument, LoadError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut document = KmlDocument::default();
    let mut path: Vec<String> = Vec::new();
    let mut folders: Vec<Option<String>> = Vec::new();
    let mut placemark: Option<PlacemarkDraft> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                match name.as_str() {
                    "Placemark" => placemark = Some(PlacemarkDraft::default()),
                    "Folder" => folders.push(None),
                    _ => {}
                }
                path.push(name);
                text_buf.clear();
            }
            Event::Text(t) => {
                let unescaped = t.unescape().map_err(|e| LoadError::Xml { details: e.to_string() })?;
                text_buf.push_str(&unescaped);
            }
            Event::CData(c) => {
                text_buf.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(_) => {
                let Some(name) = path.pop() else {
                    continue;
                };
                let parent = path.last().map(String::as_str);
                let value = std::mem::take(&mut text_buf);

                match (name.as_str(), parent) {
                    ("when", Some("TimeStamp")) => {
                        if let Some(draft) = placemark.as_mut() {
                            draft.when.get_or_insert(value);
                        }
                    }
                    ("coordinates", Some("Point")) => {
                        if let Some(draft) = placemark.as_mut() {
                            draft.coordinates.get_or_insert(value);
                        }
                    }
                    ("coordinates", Some("LineString")) => {
                        document.lines.push(LineDraft {
                            folders: folders.iter().flatten().cloned().collect(),
                            coordinates: value,
                        });
                    }
                    ("name", Some("Folder")) => {
                        if let Some(slot) = folders.last_mut() {
                            *slot = Some(value.trim().to_string());
                        }
                    }
                    ("Placemark", _) => {
                        if let Some(draft) = placemark.take() {
                            document.placemarks.push(draft);
                        }
                    }
                    ("Folder", _) => {
                        folders.pop();
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(document)
}

/// Timed fixes from KML placemarks, converted to `offset`.
///
/// Placemarks lacking either a time or a point are not track fixes and are
/// ignored; those with an unreadable time or coordinate are counted as
/// skipped. Output is in document order; sorting is the validator's job.
pub fn parse_positions(text: &str, offset: &FixedOffset) -> Result<ParsedTrack, LoadError> {
    let document = scan_document(text)?;
    let mut track = ParsedTrack::default();

    for draft in document.placemarks {
        let (Some(when), Some(coordinates)) = (draft.when, draft.coordinates) else {
            continue;
        };

        let Some(timestamp) = parse_when(&when, offset) else {
            log::warn!("Skipping placemark with unreadable time {:?}", when);
            track.skipped += 1;
            continue;
        };

        let Some(coordinate) = coordinates.split_whitespace().next().and_then(parse_coordinate_tuple) else {
            log::warn!("Skipping placemark with unreadable point {:?}", coordinates);
            track.skipped += 1;
            continue;
        };

        track
            .positions
            .push(Position::new(timestamp, coordinate.latitude, coordinate.longitude));
    }

    log::debug!(
        "KML: {} fixes parsed, {} placemarks skipped",
        track.positions.len(),
        track.skipped
    );
    Ok(track)
}

/// Untimed path vertices from `LineString` elements in document order.
///
/// With `folder` set, only LineStrings inside a folder of that name count.
pub fn parse_path(text: &str, folder: Option<&str>) -> Result<Vec<Coordinate>, LoadError> {
    let document = scan_document(text)?;

    let coordinates: Vec<Coordinate> = document
        .lines
        .iter()
        .filter(|line| match folder {
            Some(wanted) => line.folders.iter().any(|name| name == wanted),
            None => true,
        })
        .flat_map(|line| parse_coordinate_list(&line.coordinates))
        .collect();

    log::debug!("KML: {} path vertices parsed", coordinates.len());
    Ok(coordinates)
}

/// Extract the first `.kml` entry of a KMZ archive
pub fn read_kmz(bytes: &[u8]) -> Result<String, LoadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if !entry.name().to_lowercase().ends_with(".kml") {
            continue;
        }
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| LoadError::Archive { details: format!("{}: {}", entry.name(), e) })?;
        return Ok(text);
    }

    Err(LoadError::Archive {
        details: "KMZ archive contains no KML document".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const TRACK_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <TimeStamp><when>2024-05-01T00:10:00Z</when></TimeStamp>
      <Point><coordinates>127.001,37.501,0</coordinates></Point>
    </Placemark>
    <Placemark>
      <name>no time</name>
      <Point><coordinates>127.5,37.5</coordinates></Point>
    </Placemark>
    <Placemark>
      <TimeStamp><when>2024-05-01T00:05:00Z</when></TimeStamp>
      <Point><coordinates> 127.000,37.500 </coordinates></Point>
    </Placemark>
    <Placemark>
      <TimeStamp><when>yesterday</when></TimeStamp>
      <Point><coordinates>127.0,37.5</coordinates></Point>
    </Placemark>
  </Document>
</kml>"#;

    const PATH_KML: &str = r#"<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Folder>
      <name>markers</name>
      <Placemark><LineString><coordinates>1,1 2,2</coordinates></LineString></Placemark>
    </Folder>
    <Folder>
      <name> course </name>
      <Placemark>
        <LineString>
          <coordinates>
            127.0,37.5,0 127.001,37.501,0
            bogus 127.002,37.502
          </coordinates>
        </LineString>
      </Placemark>
    </Folder>
  </Document>
</kml>"#;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_parse_positions_converts_to_offset() {
        let track = parse_positions(TRACK_KML, &kst()).unwrap();

        assert_eq!(track.positions.len(), 2);
        assert_eq!(track.skipped, 1);
        let first = &track.positions[0];
        assert_eq!(first.timestamp, kst().with_ymd_and_hms(2024, 5, 1, 9, 10, 0).unwrap());
        assert_eq!(first.timestamp.offset(), &kst());
        assert_eq!(first.latitude, 37.501);
        assert_eq!(first.longitude, 127.001);
    }

    #[test]
    fn test_offset_is_injected_not_fixed() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let track = parse_positions(TRACK_KML, &utc).unwrap();

        assert_eq!(
            track.positions[1].timestamp,
            utc.with_ymd_and_hms(2024, 5, 1, 0, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_when_variants() {
        let expected = kst().with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(parse_when("2024-05-01T00:00:00Z", &kst()), Some(expected));
        assert_eq!(parse_when("2024-05-01T09:00:00+09:00", &kst()), Some(expected));
        assert_eq!(parse_when("2024-05-01T00:00:00", &kst()), Some(expected));
        assert_eq!(parse_when("01/05/2024", &kst()), None);
    }

    #[test]
    fn test_parse_path_all_linestrings() {
        let path = parse_path(PATH_KML, None).unwrap();

        assert_eq!(path.len(), 5);
        assert_eq!(path[0], Coordinate::new(1.0, 1.0));
        assert_eq!(path[2], Coordinate::new(37.5, 127.0));
    }

    #[test]
    fn test_parse_path_restricted_to_folder() {
        let path = parse_path(PATH_KML, Some("course")).unwrap();

        assert_eq!(
            path,
            vec![
                Coordinate::new(37.5, 127.0),
                Coordinate::new(37.501, 127.001),
                Coordinate::new(37.502, 127.002),
            ]
        );
        assert!(parse_path(PATH_KML, Some("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let err = parse_positions("<kml><Placemark></kml>", &kst()).unwrap_err();
        assert!(matches!(err, LoadError::Xml { .. }));
    }

    #[test]
    fn test_coordinate_tuple_parsing() {
        assert_eq!(parse_coordinate_tuple("127.5,37.25,12"), Some(Coordinate::new(37.25, 127.5)));
        assert_eq!(parse_coordinate_tuple("127.5"), None);
        assert_eq!(parse_coordinate_tuple("a,b"), None);
    }

    #[test]
    fn test_read_kmz_finds_kml_entry() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("images/readme.txt", options).unwrap();
            writer.write_all(b"not kml").unwrap();
            writer.start_file("doc.KML", options).unwrap();
            writer.write_all(PATH_KML.as_bytes()).unwrap();
            writer.finish().unwrap();
        }

        let text = read_kmz(buffer.get_ref()).unwrap();

        assert_eq!(text, PATH_KML);
    }

    #[test]
    fn test_read_kmz_without_kml_fails() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("notes.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"hello").unwrap();
            writer.finish().unwrap();
        }

        let err = read_kmz(buffer.get_ref()).unwrap_err();

        assert!(matches!(err, LoadError::Archive { .. }));
    }
}
