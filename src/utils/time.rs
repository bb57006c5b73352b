use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use chrono::DateTime;

/// Current wall clock as fractional epoch seconds, the event timestamp unit.
pub fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Parses an event timestamp: epoch seconds (`1712345678.25`) or RFC 3339
/// (`2024-04-05T19:34:38.250+00:00`). Out-of-range dates and times are
/// rejected.
pub fn parse_ts(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<f64>() {
        return v.is_finite().then_some(v);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.timestamp_micros() as f64 / 1e6)
}
