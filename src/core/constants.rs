//! Physical constants and analysis defaults

/// Mean Earth radius used by the haversine formula (m)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default radius for grouping track fixes around reference locations (m)
pub const DEFAULT_GROUPING_RADIUS_M: f64 = 300.0;

/// Default radius for pairwise track / route comparison (m)
pub const DEFAULT_COMPARE_RADIUS_M: f64 = 150.0;

/// Upper bound of the alert window: an expected alert may trail the actual
/// arrival by at most this many minutes and still pass.
pub const ALERT_PASS_WINDOW_MINUTES: i64 = 2;

/// Default UTC offset, KST (minutes)
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 9 * 60;

/// Fixed offset for a whole-minute UTC offset; `None` when out of range
pub fn utc_offset_from_minutes(minutes: i32) -> Option<chrono::FixedOffset> {
    minutes.checked_mul(60).and_then(chrono::FixedOffset::east_opt)
}

/// The default analysis offset (UTC+09:00)
pub fn default_utc_offset() -> chrono::FixedOffset {
    use chrono::Offset;
    utc_offset_from_minutes(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(|| chrono::Utc.fix())
}
