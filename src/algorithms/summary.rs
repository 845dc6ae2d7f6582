//! Arrival/departure summaries and expected-alert verdicts
//!
//! A bucket's arrival is its earliest fix and its departure the latest. When
//! the location carries an expected arrival alert ("HH:MM"), the alert is
//! placed on the arrival's calendar date and compared with the arrival:
//! `deviation = expected - arrival` in minutes, and the alert passes only when
//! it fires 0 to 2 minutes after the actual arrival.

use crate::algorithms::grouping::{LocationBucket, RadiusMatch};
use crate::core::ALERT_PASS_WINDOW_MINUTES;
use crate::validation::error::CorrelationError;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing an expected alert with the actual arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Arrival/departure summary for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub location_name: String,
    pub arrival: DateTime<FixedOffset>,
    pub departure: DateTime<FixedOffset>,
    /// Number of fixes in the bucket
    pub fix_count: usize,
    /// Expected arrival alert as given by the reference set
    pub expected_alert: Option<String>,
    /// `expected - arrival` in minutes; unset when the alert is absent or malformed
    pub deviation_minutes: Option<f64>,
    pub verdict: Verdict,
    /// Expected departure as given by the reference set (informational)
    pub expected_departure: Option<String>,
}

impl Summary {
    /// Time spent inside the radius
    pub fn dwell(&self) -> chrono::Duration {
        self.departure - self.arrival
    }
}

/// Parse an "HH:MM" alert time-of-day
pub fn parse_alert_time(alert: &str) -> Result<NaiveTime, CorrelationError> {
    NaiveTime::parse_from_str(alert.trim(), "%H:%M").map_err(|_| {
        CorrelationError::MalformedAlertTime {
            value: alert.to_string(),
        }
    })
}

/// Deviation in minutes and verdict for an alert against an arrival
pub fn evaluate_alert(arrival: &DateTime<FixedOffset>, alert: Option<&str>) -> (Option<f64>, Verdict) {
    let Some(alert) = alert else {
        return (None, Verdict::Fail);
    };

    let alert_time = match parse_alert_time(alert) {
        Ok(time) => time,
        Err(e) => {
            log::warn!("{}", e);
            return (None, Verdict::Fail);
        }
    };

    let expected_local = arrival.date_naive().and_time(alert_time);
    let Some(expected) = arrival.timezone().from_local_datetime(&expected_local).single() else {
        return (None, Verdict::Fail);
    };

    let delta = expected - *arrival;
    let deviation = match delta.num_microseconds() {
        Some(micros) => micros as f64 / 60_000_000.0,
        None => delta.num_milliseconds() as f64 / 60_000.0,
    };
    // Judged on the exact delta; the float deviation is for reporting only
    let verdict = if delta >= Duration::zero() && delta <= Duration::minutes(ALERT_PASS_WINDOW_MINUTES) {
        Verdict::Pass
    } else {
        Verdict::Fail
    };

    (Some(deviation), verdict)
}

/// Summarize a single bucket; `None` for a bucket without fixes
pub fn summarize_bucket(bucket: &LocationBucket) -> Option<Summary> {
    let arrival = bucket.positions.iter().map(|p| p.timestamp).min()?;
    let departure = bucket.positions.iter().map(|p| p.timestamp).max()?;

    let expected_alert = bucket.expected_arrival().map(str::to_string);
    let (deviation_minutes, verdict) = evaluate_alert(&arrival, expected_alert.as_deref());

    Some(Summary {
        location_name: bucket.name.clone(),
        arrival,
        departure,
        fix_count: bucket.positions.len(),
        expected_alert,
        deviation_minutes,
        verdict,
        expected_departure: bucket.expected_departure().map(str::to_string),
    })
}

/// Summaries for every non-empty bucket, ascending by arrival
pub fn summarize(grouped: &RadiusMatch) -> Vec<Summary> {
    let mut summaries: Vec<Summary> = grouped.iter().filter_map(summarize_bucket).collect();
    // Stable: equal arrivals keep bucket order
    summaries.sort_by_key(|summary| summary.arrival);
    summaries
}
