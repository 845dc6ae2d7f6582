//! Reference place sets read from CSV
//!
//! Two layouts are accepted, told apart by the header row:
//! - route layout, positional: `order, place, longitude, latitude[, arrive, depart]`
//! - named layout: columns found by header name (`장소 이름` or `name`,
//!   `longitude`, `latitude`, optional `arrive` and `depart`)

use crate::core::Location;
use crate::validation::error::LoadError;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::io::Read;

const NAME_HEADERS: [&str; 2] = ["장소 이름", "name"];

/// Which rows of a reference file become locations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteFilter {
    /// Every row with a usable coordinate
    #[default]
    All,
    /// Only rows with an expected arrival time
    RequireArrival,
}

/// Column positions for one reference file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceLayout {
    pub name: usize,
    pub longitude: usize,
    pub latitude: usize,
    pub arrive: Option<usize>,
    pub depart: Option<usize>,
}

impl ReferenceLayout {
    /// Positional route layout
    pub const ROUTE: ReferenceLayout = ReferenceLayout {
        name: 1,
        longitude: 2,
        latitude: 3,
        arrive: Some(4),
        depart: Some(5),
    };

    /// Pick the layout from the header row.
    ///
    /// A recognised name column selects the named layout, which then
    /// requires `longitude` and `latitude` headers.
    pub fn detect(headers: &StringRecord) -> Result<Self, LoadError> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim().eq_ignore_ascii_case(wanted))
        };

        let Some(name) = NAME_HEADERS.iter().find_map(|h| find(h)) else {
            return Ok(Self::ROUTE);
        };

        let longitude = find("longitude").ok_or_else(|| LoadError::MissingColumn {
            column: "longitude".to_string(),
        })?;
        let latitude = find("latitude").ok_or_else(|| LoadError::MissingColumn {
            column: "latitude".to_string(),
        })?;

        Ok(Self {
            name,
            longitude,
            latitude,
            arrive: find("arrive"),
            depart: find("depart"),
        })
    }

    fn min_columns(&self) -> usize {
        self.name.max(self.longitude).max(self.latitude) + 1
    }
}

/// Strip a parenthesised annotation: `"Office (2F)"` becomes `"Office"`
pub fn clean_place_name(raw: &str) -> String {
    raw.split('(').next().unwrap_or_default().trim().to_string()
}

/// Normalise an alert cell: `.` separators become `:`; `-` or blank means none
pub fn normalize_alert(raw: &str) -> Option<String> {
    let alert = raw.replace('.', ":").trim().to_string();
    if alert.is_empty() || alert == "-" {
        None
    } else {
        Some(alert)
    }
}

fn parse_row(record: &StringRecord, layout: &ReferenceLayout, strip_annotations: bool) -> Option<Location> {
    if record.len() < layout.min_columns() {
        return None;
    }

    let longitude = record.get(layout.longitude)?.parse::<f64>().ok()?;
    let latitude = record.get(layout.latitude)?.parse::<f64>().ok()?;
    let raw_name = record.get(layout.name)?;
    let name = if strip_annotations {
        clean_place_name(raw_name)
    } else {
        raw_name.to_string()
    };
    if name.is_empty() {
        return None;
    }

    let mut location = Location::new(name, latitude, longitude);
    let cell = |column: Option<usize>| column.and_then(|c| record.get(c)).and_then(normalize_alert);
    location.expected_arrival = cell(layout.arrive);
    location.expected_departure = cell(layout.depart);
    Some(location)
}

/// Read reference locations from CSV text.
///
/// Rows that are too short, carry unparsable coordinates or have no name are
/// skipped with a warning. Row order is preserved. Place names are cut at the
/// first `(` only for the route layout read as a place list
/// (`RouteFilter::All`); route stops and named-layout rows keep the full text.
pub fn parse_reference<R: Read>(reader: R, filter: RouteFilter) -> Result<Vec<Location>, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let layout = ReferenceLayout::detect(csv_reader.headers()?)?;
    let strip_annotations = layout == ReferenceLayout::ROUTE && filter == RouteFilter::All;
    let mut locations = Vec::new();

    for (row, record) in csv_reader.records().enumerate() {
        let record = record?;
        let Some(location) = parse_row(&record, &layout, strip_annotations) else {
            log::warn!("Skipping reference row {}: {:?}", row + 2, record);
            continue;
        };
        if filter == RouteFilter::RequireArrival && location.expected_arrival.is_none() {
            continue;
        }
        locations.push(location);
    }

    log::debug!("Reference set: {} locations loaded", locations.len());
    Ok(locations)
}
