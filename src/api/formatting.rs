//! Report output formatting
//!
//! Analyses are flattened into row types that render three ways: aligned
//! text tables, JSON and CSV. JSON output may also serialize the analysis
//! results directly, which keeps nested structure.

use crate::algorithms::divergence::TrackComparison;
use crate::algorithms::grouping::RadiusMatch;
use crate::algorithms::matcher::MatchKind;
use crate::algorithms::summary::{Summary, Verdict};
use crate::api::analysis::RouteMatch;
use crate::core::Position;
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

fn display_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn display_time(value: &DateTime<FixedOffset>) -> String {
    value.format(TIME_FORMAT).to_string()
}

fn display_optional_time(value: &Option<DateTime<FixedOffset>>) -> String {
    value.as_ref().map(display_time).unwrap_or_else(|| "-".to_string())
}

fn display_degrees(value: &Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_else(|| "-".to_string())
}

fn display_coordinate(value: &f64) -> String {
    format!("{:.6}", value)
}

fn display_meters(value: &f64) -> String {
    format!("{:.1}", value)
}

fn display_minutes(value: &Option<f64>) -> String {
    value.map(|v| format!("{:+.1}", v)).unwrap_or_else(|| "-".to_string())
}

fn display_flag(value: &bool) -> String {
    let flag = if *value { "yes" } else { "no" };
    flag.to_string()
}

/// One fix, optionally attributed to a place. A place without fixes is a
/// row with only the place set.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct FixRow {
    #[tabled(rename = "Place", display_with = "display_text")]
    pub place: Option<String>,
    #[tabled(rename = "Time", display_with = "display_optional_time")]
    pub time: Option<DateTime<FixedOffset>>,
    #[tabled(rename = "Latitude", display_with = "display_degrees")]
    pub latitude: Option<f64>,
    #[tabled(rename = "Longitude", display_with = "display_degrees")]
    pub longitude: Option<f64>,
}

impl FixRow {
    fn fix(place: Option<&str>, position: &Position) -> Self {
        Self {
            place: place.map(str::to_string),
            time: Some(position.timestamp),
            latitude: Some(position.latitude),
            longitude: Some(position.longitude),
        }
    }
}

pub fn fix_rows(positions: &[Position]) -> Vec<FixRow> {
    positions.iter().map(|p| FixRow::fix(None, p)).collect()
}

pub fn place_rows(grouped: &RadiusMatch) -> Vec<FixRow> {
    let mut rows = Vec::new();
    for bucket in grouped {
        if bucket.is_empty() {
            rows.push(FixRow {
                place: Some(bucket.name.clone()),
                time: None,
                latitude: None,
                longitude: None,
            });
        }
        rows.extend(bucket.positions.iter().map(|p| FixRow::fix(Some(&bucket.name), p)));
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct VisitRow {
    #[tabled(rename = "Place")]
    pub place: String,
    #[tabled(rename = "Arrival", display_with = "display_time")]
    pub arrival: DateTime<FixedOffset>,
    #[tabled(rename = "Departure", display_with = "display_time")]
    pub departure: DateTime<FixedOffset>,
    #[tabled(rename = "Fixes")]
    pub fixes: usize,
    #[tabled(rename = "Expected", display_with = "display_text")]
    pub expected_alert: Option<String>,
    #[tabled(rename = "Deviation (min)", display_with = "display_minutes")]
    pub deviation_minutes: Option<f64>,
    #[tabled(rename = "Verdict")]
    pub verdict: Verdict,
}

pub fn visit_rows(summaries: &[Summary]) -> Vec<VisitRow> {
    summaries
        .iter()
        .map(|s| VisitRow {
            place: s.location_name.clone(),
            arrival: s.arrival,
            departure: s.departure,
            fixes: s.fix_count,
            expected_alert: s.expected_alert.clone(),
            deviation_minutes: s.deviation_minutes,
            verdict: s.verdict,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct RouteRow {
    #[tabled(rename = "Place")]
    pub place: String,
    #[tabled(rename = "Arrive", display_with = "display_text")]
    pub expected_arrival: Option<String>,
    #[tabled(rename = "Track time", display_with = "display_time")]
    pub time: DateTime<FixedOffset>,
    #[tabled(rename = "Latitude", display_with = "display_coordinate")]
    pub latitude: f64,
    #[tabled(rename = "Longitude", display_with = "display_coordinate")]
    pub longitude: f64,
    #[tabled(rename = "Distance (m)", display_with = "display_meters")]
    pub distance_m: f64,
    #[tabled(rename = "Match")]
    pub kind: MatchKind,
}

pub fn route_rows(matches: &[RouteMatch]) -> Vec<RouteRow> {
    matches
        .iter()
        .map(|m| RouteRow {
            place: m.place.clone(),
            expected_arrival: m.expected_arrival.clone(),
            time: m.timestamp,
            latitude: m.latitude,
            longitude: m.longitude,
            distance_m: m.distance_m,
            kind: m.kind,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct DivergenceRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Base lat", display_with = "display_coordinate")]
    pub base_latitude: f64,
    #[tabled(rename = "Base lon", display_with = "display_coordinate")]
    pub base_longitude: f64,
    #[tabled(rename = "Test lat", display_with = "display_coordinate")]
    pub test_latitude: f64,
    #[tabled(rename = "Test lon", display_with = "display_coordinate")]
    pub test_longitude: f64,
    #[tabled(rename = "Distance (m)", display_with = "display_meters")]
    pub distance_m: f64,
    #[tabled(rename = "Diverged", display_with = "display_flag")]
    pub diverged: bool,
}

pub fn divergence_rows(comparison: &TrackComparison) -> Vec<DivergenceRow> {
    comparison
        .pairs
        .iter()
        .map(|pair| DivergenceRow {
            index: pair.index,
            base_latitude: pair.base.latitude,
            base_longitude: pair.base.longitude,
            test_latitude: pair.test.latitude,
            test_longitude: pair.test.longitude,
            distance_m: pair.distance_m,
            diverged: pair.diverged,
        })
        .collect()
}

/// Human-readable table formatter
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    /// Plain ASCII borders instead of box drawing
    pub ascii: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_table<T: Tabled>(&self, rows: &[T]) -> String {
        if rows.is_empty() {
            return "(no rows)".to_string();
        }
        let mut table = Table::new(rows);
        if self.ascii {
            table.with(Style::ascii());
        } else {
            table.with(Style::modern());
        }
        table.to_string()
    }

    /// One-line verdict for a track comparison
    pub fn comparison_footer(&self, comparison: &TrackComparison) -> String {
        let mut footer = format!(
            "{} of {} pairs diverge beyond {} m",
            comparison.diverged_count,
            comparison.pairs.len(),
            comparison.threshold_m
        );
        if let Some(max) = comparison.max_distance_m {
            footer.push_str(&format!(" (max {:.1} m)", max));
        }
        if comparison.unpaired_base > 0 || comparison.unpaired_test > 0 {
            footer.push_str(&format!(
                "; unpaired vertices: base {}, test {}",
                comparison.unpaired_base, comparison.unpaired_test
            ));
        }
        footer
    }
}

/// JSON formatter for structured output
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn format_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, serde_json::Error> {
        if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

/// CSV formatter for flat row types
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    pub include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self { include_header: true }
    }
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format_csv<T: Serialize>(&self, rows: &[T]) -> Result<String, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(self.include_header)
            .from_writer(Vec::new());
        for row in rows {
            writer.serialize(row)?;
        }
        let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
