//! Core data types used throughout the monitor
//!
//! # Key Types
//!
//! - **`Record`**: A single sensor reading (timestamp + source id + metric)
//! - **`Timestamp`**: Milliseconds on the stream's logical timeline
//! - **`Window`**: Half-open time bucket `[start, end)` used for aggregation
//! - **`WindowResult`**: The top-N records of one completed window
//!
//! # Example
//!
//! ```rust
//! use kuba_congestion::types::{Record, Window};
//!
//! let record = Record::new(70_000, "L7", 12);
//! let window = Window::containing(record.timestamp, 60_000);
//! assert_eq!(window.start, 60_000);
//! assert_eq!(window.end, 120_000);
//! assert!(window.contains(record.timestamp));
//! ```

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in milliseconds
///
/// Dated inputs map to Unix epoch milliseconds; time-of-day inputs map to
/// milliseconds since midnight. Either way the aggregator only relies on a
/// single monotonic timeline.
pub type Timestamp = i64;

/// Milliseconds in one day
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Timestamps below this are rendered as time of day plus a day count
///
/// Time-of-day streams that run past midnight land in `[1, 366)` days;
/// anything at or above is taken as a dated reading.
pub const TIME_OF_DAY_HORIZON: Timestamp = 366 * MILLIS_PER_DAY;

/// A single traffic sensor reading
///
/// Immutable once parsed. Ownership moves from the parser into the queue
/// and from the queue into the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// When the reading was taken
    pub timestamp: Timestamp,
    /// Identifier of the sensor (traffic light)
    pub source_id: String,
    /// Congestion metric (number of cars observed)
    pub metric: u64,
}

impl Record {
    /// Create a new record
    pub fn new(timestamp: Timestamp, source_id: impl Into<String>, metric: u64) -> Self {
        Self {
            timestamp,
            source_id: source_id.into(),
            metric,
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            format_timestamp(self.timestamp),
            self.source_id,
            self.metric
        )
    }
}

/// Half-open time window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// Start timestamp (inclusive)
    pub start: Timestamp,
    /// End timestamp (exclusive)
    pub end: Timestamp,
}

impl Window {
    /// The window of length `duration_ms` that contains `timestamp`
    ///
    /// The start is `timestamp` floored to a multiple of `duration_ms`.
    /// Euclidean division keeps the floor correct for negative timestamps.
    /// `duration_ms` must be positive; callers validate it at construction.
    pub fn containing(timestamp: Timestamp, duration_ms: i64) -> Self {
        let start = timestamp.saturating_sub(timestamp.rem_euclid(duration_ms));
        Self {
            start,
            end: start.saturating_add(duration_ms),
        }
    }

    /// Check if a timestamp falls inside the window
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Window length in milliseconds
    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

/// Result of one completed window
///
/// `records` holds at most N records ordered by metric descending, then
/// timestamp ascending, then source id ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowResult {
    /// The window the records belong to
    pub window: Window,
    /// Top-N records of the window
    pub records: Vec<Record>,
    /// Number of records the window accumulated before selection
    pub total_records: usize,
}

/// Render a timestamp for reports
///
/// Values on the time-of-day timeline render as `HH:MM:SS`, with a `(+Nd)`
/// suffix once a stream has wrapped past midnight. Anything else is epoch
/// milliseconds and renders as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(timestamp: Timestamp) -> String {
    if (0..TIME_OF_DAY_HORIZON).contains(&timestamp) {
        let days = timestamp / MILLIS_PER_DAY;
        let of_day = timestamp % MILLIS_PER_DAY;
        let secs = (of_day / 1000) as u32;
        let millis = (of_day % 1000) as u32;

        let time = match NaiveTime::from_num_seconds_from_midnight_opt(secs, millis * 1_000_000) {
            Some(t) if t.nanosecond() == 0 => t.format("%H:%M:%S").to_string(),
            Some(t) => t.format("%H:%M:%S%.3f").to_string(),
            None => of_day.to_string(),
        };
        if days == 0 {
            time
        } else {
            format!("{} (+{}d)", time, days)
        }
    } else {
        match DateTime::<Utc>::from_timestamp_millis(timestamp) {
            Some(dt) => dt.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string(),
            None => timestamp.to_string(),
        }
    }
}
