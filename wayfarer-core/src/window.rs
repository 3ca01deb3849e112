use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;

use crate::{SearchError, SearchResult};

/// Days added to the start of the requested day. Two days absorbs client
/// timezone drift while still covering the intended departure day.
pub const DEFAULT_WINDOW_DAYS: u32 = 2;

/// Half-open `[start, end)` range matched against departure timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Truncate `epoch_seconds` to midnight UTC and extend by `offset_days`.
pub fn build_window(epoch_seconds: i64, offset_days: u32) -> SearchResult<DateWindow> {
    let instant = DateTime::<Utc>::from_timestamp(epoch_seconds, 0).ok_or_else(|| {
        SearchError::InvalidTimestamp(format!("{} is outside the supported range", epoch_seconds))
    })?;

    let start = instant.date_naive().and_time(NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_signed(Duration::days(i64::from(offset_days)))
        .ok_or_else(|| {
            SearchError::InvalidTimestamp(format!("{} plus {} days overflows", epoch_seconds, offset_days))
        })?;

    Ok(DateWindow { start, end })
}

/// Parse a raw epoch-seconds string and build its window.
pub fn parse_window(raw: &str, offset_days: u32) -> SearchResult<DateWindow> {
    let epoch_seconds: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SearchError::InvalidTimestamp(format!("'{}' is not an epoch second value", raw)))?;

    build_window(epoch_seconds, offset_days)
}
