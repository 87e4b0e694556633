//! Tumbling-window top-N aggregation
//!
//! Buckets records into fixed windows `[start, start + duration)` on the
//! timeline defined by record timestamps (not arrival time) and emits the
//! top-N records of each window once it closes.
//!
//! # State machine
//!
//! ```text
//!            first record                  ts >= end
//!   [idle] ───────────────► [accumulating] ──────────► emit, open window(ts)
//!     ▲                          │    ▲                        │
//!     │         flush()          │    └────────────────────────┘
//!     └──────────────────────────┘  (emits if ≥ 1 record)
//! ```
//!
//! # Policies
//!
//! - Gaps: windows that received no record are never emitted.
//! - Late records (`ts < start`) are kept in the open window; there is no
//!   watermark or grace period.
//! - The open window's buffer is unbounded; its size is arrival rate times
//!   window duration.

use serde::Serialize;
use tracing::debug;

use super::topn::select_top_n;
use crate::error::{Error, Result};
use crate::types::{Record, Timestamp, Window, WindowResult};

/// Maximum accepted N
pub const MAX_TOP_N: usize = 10_000;

/// Aggregator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregatorStats {
    /// Records passed to `accept`
    pub records_accepted: u64,
    /// Window results produced (including the final flush)
    pub windows_emitted: u64,
    /// Records that arrived before the open window's start
    pub late_records: u64,
    /// Empty windows skipped over by timestamp gaps
    pub skipped_windows: u64,
    /// Largest number of records held by one window
    pub peak_window_len: usize,
}

/// The window currently accumulating
#[derive(Debug)]
struct OpenWindow {
    window: Window,
    records: Vec<Record>,
}

/// Where an incoming record goes relative to the open window
enum Placement {
    /// No window open yet
    Open,
    /// Inside the open window
    Current,
    /// Before the open window's start
    Late,
    /// At or past the open window's end
    Advance,
}

/// Groups records into windows and selects the top N per window
#[derive(Debug)]
pub struct WindowAggregator {
    window_duration_ms: i64,
    top_n: usize,
    open: Option<OpenWindow>,
    stats: AggregatorStats,
}

impl WindowAggregator {
    /// Create an aggregator
    ///
    /// # Arguments
    ///
    /// * `window_duration_ms` - Window length in milliseconds, must be > 0
    /// * `top_n` - Records emitted per window, must be in `1..=MAX_TOP_N`
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for a non-positive duration or N.
    pub fn new(window_duration_ms: i64, top_n: usize) -> Result<Self> {
        if window_duration_ms <= 0 {
            return Err(Error::Configuration(format!(
                "window duration must be > 0 ms, got {}",
                window_duration_ms
            )));
        }
        if top_n == 0 || top_n > MAX_TOP_N {
            return Err(Error::Configuration(format!(
                "top_n must be in [1, {}], got {}",
                MAX_TOP_N, top_n
            )));
        }

        Ok(Self {
            window_duration_ms,
            top_n,
            open: None,
            stats: AggregatorStats::default(),
        })
    }

    /// Feed one record
    ///
    /// Returns the result of the previous window when this record closes it.
    pub fn accept(&mut self, record: Record) -> Option<WindowResult> {
        self.stats.records_accepted += 1;
        let ts = record.timestamp;

        let placement = match &self.open {
            None => Placement::Open,
            Some(open) if open.window.contains(ts) => Placement::Current,
            Some(open) if ts < open.window.start => Placement::Late,
            Some(_) => Placement::Advance,
        };

        match placement {
            Placement::Open => {
                self.open = Some(self.open_window(ts, record));
                None
            },
            Placement::Current => {
                self.push_current(record);
                None
            },
            Placement::Late => {
                self.stats.late_records += 1;
                debug!(
                    timestamp = ts,
                    source_id = %record.source_id,
                    "Late record assigned to open window"
                );
                self.push_current(record);
                None
            },
            Placement::Advance => {
                let next = self.open_window(ts, record);
                let next_start = next.window.start;
                let closed = self.open.replace(next)?;

                let gap = (next_start - closed.window.end) / self.window_duration_ms;
                if gap > 0 {
                    self.stats.skipped_windows += gap as u64;
                    debug!(skipped = gap, "Skipped empty windows");
                }
                self.finish(closed)
            },
        }
    }

    /// Close the open window at end of stream
    ///
    /// Returns its result if it holds at least one record. The aggregator
    /// is idle afterwards and may be reused.
    pub fn flush(&mut self) -> Option<WindowResult> {
        let open = self.open.take()?;
        self.finish(open)
    }

    /// The window currently accumulating, if any
    pub fn current_window(&self) -> Option<Window> {
        self.open.as_ref().map(|o| o.window)
    }

    /// Records buffered in the open window
    pub fn pending_len(&self) -> usize {
        self.open.as_ref().map_or(0, |o| o.records.len())
    }

    /// Configured window duration in milliseconds
    pub fn window_duration_ms(&self) -> i64 {
        self.window_duration_ms
    }

    /// Configured N
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Counter snapshot
    pub fn stats(&self) -> AggregatorStats {
        self.stats
    }

    fn open_window(&self, ts: Timestamp, record: Record) -> OpenWindow {
        OpenWindow {
            window: Window::containing(ts, self.window_duration_ms),
            records: vec![record],
        }
    }

    fn push_current(&mut self, record: Record) {
        if let Some(open) = self.open.as_mut() {
            open.records.push(record);
            if open.records.len() > self.stats.peak_window_len {
                self.stats.peak_window_len = open.records.len();
            }
        }
    }

    fn finish(&mut self, open: OpenWindow) -> Option<WindowResult> {
        if open.records.is_empty() {
            return None;
        }

        let total_records = open.records.len();
        if total_records > self.stats.peak_window_len {
            self.stats.peak_window_len = total_records;
        }
        let records = select_top_n(open.records, self.top_n);
        self.stats.windows_emitted += 1;

        debug!(
            window_start = open.window.start,
            window_end = open.window.end,
            total_records,
            emitted = records.len(),
            "Window closed"
        );

        Some(WindowResult {
            window: open.window,
            records,
            total_records,
        })
    }
}
