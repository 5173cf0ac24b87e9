//! Wall-clock formatting and expiry comparison.
//!
//! Lease windows are stored as local wall-clock strings (second precision)
//! so they render directly in user-facing views; comparisons parse them back
//! through the same format. Functions take an explicit `now` timestamp so
//! callers (and tests) control the clock.

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};

/// Storage/display format for lease start/end times.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date-only format for credential expiry (day granularity).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a unix timestamp as a local wall-clock string.
pub fn format_local(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.format(TS_FORMAT).to_string()
        }
        chrono::LocalResult::None => String::new(),
    }
}

/// Parse a local wall-clock string back to a unix timestamp.
pub fn parse_local(s: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), TS_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp())
}

/// Whether a formatted end time has passed. Unparseable strings count as
/// expired so a corrupt lease cannot stay redeemable forever.
pub fn is_past(end_time: &str, now: i64) -> bool {
    match parse_local(end_time) {
        Some(end) => now > end,
        None => true,
    }
}

/// Whether a day-granularity expiry date has passed.
///
/// A credential expiring on `2026-08-07` is usable through the whole of that
/// day and expired from the start of the next.
pub fn date_expired(expires_on: &str, now: i64) -> bool {
    let Ok(date) = NaiveDate::parse_from_str(expires_on.trim(), DATE_FORMAT) else {
        return true;
    };
    let today = match Local.timestamp_opt(now, 0) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        chrono::LocalResult::None => return true,
    };
    today > date
}
