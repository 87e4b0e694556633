//! Whitespace-separated record parser
//!
//! # Format
//!
//! ```text
//! <time> <source_id> <count>
//! ```
//!
//! # Examples
//!
//! ```text
//! 08:00 TL-1 12
//! 08:05:30 TL-2 40
//! 2024-03-01T08:00:00Z TL-1 7
//! # comments and blank lines are ignored
//! ```
//!
//! # Timestamps
//!
//! - `HH:MM`, `HH:MM:SS[.fff]`: milliseconds since midnight
//! - `YYYY-MM-DDTHH:MM:SS[.fff]`: UTC epoch milliseconds
//! - RFC 3339 with offset: epoch milliseconds
//!
//! [`parse_timestamp`] also takes the space-separated `YYYY-MM-DD HH:MM:SS`
//! form, which cannot appear in a line since fields split on whitespace.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};

use super::error::{ParseError, ParseErrorKind};
use super::RecordParser;
use crate::types::{Record, Timestamp};

/// Parser configuration
#[derive(Debug, Clone)]
pub struct WhitespaceParserConfig {
    /// Maximum line length in bytes (default: 64KB)
    pub max_line_length: usize,
    /// Reject lines with more than three fields (default: true)
    pub reject_trailing: bool,
}

impl Default for WhitespaceParserConfig {
    fn default() -> Self {
        Self {
            max_line_length: 64 * 1024, // 64 KB
            reject_trailing: true,
        }
    }
}

/// Parser for `<time> <source_id> <count>` lines
#[derive(Debug, Clone, Default)]
pub struct WhitespaceParser {
    config: WhitespaceParserConfig,
}

impl WhitespaceParser {
    /// Create a new parser with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new parser with custom configuration
    pub fn with_config(config: WhitespaceParserConfig) -> Self {
        Self { config }
    }
}

impl RecordParser for WhitespaceParser {
    fn parse(&self, line: &str) -> Result<Record, ParseError> {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            return Err(ParseError::new(ParseErrorKind::EmptyInput));
        }

        if line.len() > self.config.max_line_length {
            return Err(ParseError::new(ParseErrorKind::InputTooLarge));
        }

        let err = |kind| ParseError::new(kind).with_context(line);
        let mut fields = line.split_whitespace();

        let raw_time = fields
            .next()
            .ok_or_else(|| err(ParseErrorKind::MissingField { field: "timestamp" }))?;
        let source_id = fields
            .next()
            .ok_or_else(|| err(ParseErrorKind::MissingField { field: "source_id" }))?;
        let raw_metric = fields
            .next()
            .ok_or_else(|| err(ParseErrorKind::MissingField { field: "metric" }))?;

        if self.config.reject_trailing {
            if let Some(extra) = fields.next() {
                return Err(err(ParseErrorKind::TrailingInput {
                    extra: extra.to_string(),
                }));
            }
        }

        let timestamp = parse_timestamp(raw_time).ok_or_else(|| {
            err(ParseErrorKind::InvalidTimestamp {
                value: raw_time.to_string(),
            })
        })?;

        let metric = raw_metric.parse::<u64>().map_err(|e| {
            err(ParseErrorKind::InvalidMetric {
                value: raw_metric.to_string(),
                reason: e.to_string(),
            })
        })?;

        Ok(Record::new(timestamp, source_id, metric))
    }
}

/// Parse a timestamp in any accepted format into milliseconds
///
/// Returns `None` when no format matches.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(t) = NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
    {
        let millis = t.num_seconds_from_midnight() as i64 * 1000
            + (t.nanosecond() / 1_000_000) as i64;
        return Some(millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}
