//! Analysis entry points and report formatting

pub mod analysis;
pub mod formatting;

pub use analysis::{RouteMatch, TrackAnalyzer, VisitReport};
pub use formatting::{
    divergence_rows, fix_rows, place_rows, route_rows, visit_rows, CsvFormatter, JsonFormatter, OutputFormat,
    TextFormatter,
};
