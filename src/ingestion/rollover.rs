//! Midnight rollover for time-of-day streams
//!
//! Time-of-day readings (`HH:MM[:SS]`) carry no date, so a stream that runs
//! past midnight would restart at zero and look like one long burst of late
//! data. [`DayRollover`] keeps such streams on a continuous timeline: when a
//! time-of-day value falls more than half a day behind the previous one, a
//! new day has started and every following value is shifted by one more
//! day.
//!
//! Dated readings (epoch milliseconds) pass through untouched. Smaller
//! backward steps are left alone and reach the aggregator as late records.

use tracing::debug;

use crate::types::{Record, Timestamp, MILLIS_PER_DAY};

/// Backward step that counts as a new day rather than a late reading
pub const ROLLOVER_THRESHOLD_MS: i64 = MILLIS_PER_DAY / 2;

/// Per-stream day counter for time-of-day timestamps
#[derive(Debug, Clone, Default)]
pub struct DayRollover {
    /// Previous raw time-of-day value
    last_time_of_day: Option<Timestamp>,
    /// Whole days added so far
    days: i64,
}

impl DayRollover {
    /// Start on day zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Days added to time-of-day readings so far
    pub fn days(&self) -> i64 {
        self.days
    }

    /// Map a raw timestamp onto the continuous timeline
    pub fn adjust(&mut self, timestamp: Timestamp) -> Timestamp {
        if !(0..MILLIS_PER_DAY).contains(&timestamp) {
            return timestamp;
        }

        if let Some(last) = self.last_time_of_day {
            if last - timestamp > ROLLOVER_THRESHOLD_MS {
                self.days += 1;
                debug!(
                    day = self.days,
                    previous = last,
                    current = timestamp,
                    "Time of day wrapped past midnight"
                );
            }
        }
        self.last_time_of_day = Some(timestamp);

        timestamp + self.days * MILLIS_PER_DAY
    }

    /// Apply [`adjust`](Self::adjust) to a record's timestamp
    pub fn apply(&mut self, mut record: Record) -> Record {
        record.timestamp = self.adjust(record.timestamp);
        record
    }
}
