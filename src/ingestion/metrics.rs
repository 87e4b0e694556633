//! Pipeline metrics collection
//!
//! Counters for both loops of the pipeline. Each counter is an independent
//! atomic written by exactly one loop, so reporting never contends with the
//! queue lock.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Pipeline metrics collector
///
/// Thread-safe metrics collection using relaxed atomic updates.
pub struct PipelineMetrics {
    // === Ingestion Counters ===
    /// Raw lines read from the source
    lines_read: AtomicU64,
    /// Lines successfully parsed into records
    records_parsed: AtomicU64,
    /// Malformed lines skipped
    records_skipped: AtomicU64,
    /// Records accepted by the queue
    records_enqueued: AtomicU64,

    // === Analysis Counters ===
    /// Records handed to the aggregator
    records_analyzed: AtomicU64,
    /// Window results delivered to the sink
    windows_emitted: AtomicU64,
    /// Sink calls that panicked
    sink_failures: AtomicU64,

    // === Latency Tracking (simple average) ===
    /// Sum of sink emit latencies in microseconds
    emit_latency_sum_us: AtomicU64,
    /// Count of emit latency samples
    emit_latency_count: AtomicU64,

    /// When metrics collection started
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            lines_read: AtomicU64::new(0),
            records_parsed: AtomicU64::new(0),
            records_skipped: AtomicU64::new(0),
            records_enqueued: AtomicU64::new(0),
            records_analyzed: AtomicU64::new(0),
            windows_emitted: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            emit_latency_sum_us: AtomicU64::new(0),
            emit_latency_count: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    // === Recording Methods ===

    /// Record a raw line read from the source
    #[inline]
    pub fn record_line_read(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successfully parsed line
    #[inline]
    pub fn record_parsed(&self) {
        self.records_parsed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a skipped (malformed) line
    #[inline]
    pub fn record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record accepted by the queue
    #[inline]
    pub fn record_enqueued(&self) {
        self.records_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record consumed by the aggregator
    #[inline]
    pub fn record_analyzed(&self) {
        self.records_analyzed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a window result delivered to the sink
    #[inline]
    pub fn record_window_emitted(&self, latency: Duration) {
        self.windows_emitted.fetch_add(1, Ordering::Relaxed);

        let latency_us = latency.as_micros() as u64;
        let _ = self.emit_latency_sum_us.fetch_update(
            Ordering::Relaxed,
            Ordering::Relaxed,
            |current| Some(current.saturating_add(latency_us)),
        );
        self.emit_latency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sink failure
    #[inline]
    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    // === Query Methods ===

    /// Get total lines read
    pub fn lines_read(&self) -> u64 {
        self.lines_read.load(Ordering::Relaxed)
    }

    /// Get total skipped lines
    pub fn records_skipped(&self) -> u64 {
        self.records_skipped.load(Ordering::Relaxed)
    }

    /// Get total windows emitted
    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted.load(Ordering::Relaxed)
    }

    /// Get average sink emit latency in microseconds
    pub fn avg_emit_latency_us(&self) -> u64 {
        let sum = self.emit_latency_sum_us.load(Ordering::Relaxed);
        let count = self.emit_latency_count.load(Ordering::Relaxed);
        if count > 0 {
            sum / count
        } else {
            0
        }
    }

    /// Get time since metrics collection started
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Calculate analyzed records per second
    pub fn records_per_second(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records_analyzed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get a complete metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            records_parsed: self.records_parsed.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            records_enqueued: self.records_enqueued.load(Ordering::Relaxed),
            records_analyzed: self.records_analyzed.load(Ordering::Relaxed),
            windows_emitted: self.windows_emitted.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            avg_emit_latency_us: self.avg_emit_latency_us(),
            uptime_us: self.uptime().as_micros() as u64,
            records_per_second: self.records_per_second(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete metrics snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    /// Raw lines read from the source
    pub lines_read: u64,
    /// Lines parsed into records
    pub records_parsed: u64,
    /// Malformed lines skipped
    pub records_skipped: u64,
    /// Records accepted by the queue
    pub records_enqueued: u64,
    /// Records consumed by the aggregator
    pub records_analyzed: u64,
    /// Window results delivered to the sink
    pub windows_emitted: u64,
    /// Sink calls that panicked
    pub sink_failures: u64,
    /// Average sink emit latency in microseconds
    pub avg_emit_latency_us: u64,
    /// Time since collection started, in microseconds
    pub uptime_us: u64,
    /// Records analyzed per second
    pub records_per_second: f64,
}

impl MetricsSnapshot {
    /// Fraction of read lines that were skipped (0.0 - 1.0)
    pub fn skip_rate(&self) -> f64 {
        if self.lines_read > 0 {
            self.records_skipped as f64 / self.lines_read as f64
        } else {
            0.0
        }
    }
}
