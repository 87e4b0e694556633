//! Two-thread ingestion/analysis pipeline
//!
//! # Architecture
//!
//! ```text
//!  ingest thread                               analysis thread
//! ┌──────────────────────────┐               ┌─────────────────────────────┐
//! │ RecordSource ─► Parser ──┼─► BoundedQueue ─► WindowAggregator ─► Sink  │
//! └──────────────────────────┘   (only shared └─────────────────────────────┘
//!                                 mutable state)
//! ```
//!
//! - The ingest thread blocks only in `push` (queue full).
//! - The analysis thread blocks only in `pop` (queue empty), then drains any
//!   backlog with `try_pop` before parking again.
//! - When the source is exhausted or fails, the ingest thread closes the
//!   queue. The analysis thread drains what is left, flushes the final
//!   window and exits. Nothing buffered is lost.
//! - Time-of-day readings pass through a [`DayRollover`] on the ingest
//!   side, so a stream that runs past midnight keeps opening new windows.
//!
//! [`Pipeline::run_sequential`] does the same work on the calling thread
//! without a queue, as a baseline for the threaded run.
//!
//! # Example
//!
//! ```rust
//! use kuba_congestion::config::PipelineConfig;
//! use kuba_congestion::ingestion::{VecSource, WhitespaceParser};
//! use kuba_congestion::pipeline::Pipeline;
//! use kuba_congestion::types::WindowResult;
//!
//! let config = PipelineConfig { queue_capacity: 4, window_duration_ms: 60_000, top_n: 1 };
//! let source = VecSource::new(["00:00:10 A 5", "00:00:50 B 9", "00:01:05 C 3"]);
//!
//! let mut windows = Vec::new();
//! let report = Pipeline::new(config)?
//!     .run(source, WhitespaceParser::new(), |r: &WindowResult| windows.push(r.clone()))?;
//!
//! assert_eq!(report.metrics.windows_emitted, 2);
//! assert_eq!(windows[0].records[0].source_id, "B");
//! # Ok::<(), kuba_congestion::Error>(())
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::aggregation::{AggregatorStats, WindowAggregator};
use crate::config::PipelineConfig;
use crate::error::{Error, Result, SourceError};
use crate::ingestion::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::ingestion::protocol::RecordParser;
use crate::ingestion::queue::{BoundedQueue, QueueStats};
use crate::ingestion::rollover::DayRollover;
use crate::ingestion::source::RecordSource;
use crate::sink::ResultSink;
use crate::types::{Record, WindowResult};

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Pipeline counters for this run
    pub metrics: MetricsSnapshot,
    /// Final queue statistics (`None` for a sequential run)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<QueueStats>,
    /// Aggregator counters
    pub aggregator: AggregatorStats,
    /// Wall time from start to both threads joined
    #[serde(serialize_with = "serialize_micros")]
    pub elapsed: Duration,
}

fn serialize_micros<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_micros() as u64)
}

/// Closes the queue when dropped
///
/// Held by both loops so a panicking loop still releases the other one.
struct CloseOnDrop<'a>(&'a BoundedQueue<Record>);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Producer/consumer pipeline over a bounded queue
///
/// A `Pipeline` holds only configuration; every run starts from fresh
/// queue, aggregator and metrics state, so one pipeline can be run many
/// times.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Pipeline configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run both loops to completion
    ///
    /// Blocks until the source is exhausted, every record has been analyzed
    /// and the final window has been flushed to the sink.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` before any thread starts
    /// - `Error::Source` if the source failed; records read before the
    ///   failure are still analyzed and emitted
    /// - `Error::WorkerPanicked` if a loop panicked
    pub fn run<S, P, K>(&self, source: S, parser: P, sink: K) -> Result<PipelineReport>
    where
        S: RecordSource + Send,
        P: RecordParser + Send,
        K: ResultSink + Send,
    {
        self.run_with_metrics(&PipelineMetrics::new(), source, parser, sink)
    }

    /// Run both loops, counting into a caller-owned metrics handle
    ///
    /// Lets another thread watch the counters while the run is in
    /// progress. Counters are not reset: pass a fresh `PipelineMetrics`
    /// per run for per-run figures.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with_metrics<S, P, K>(
        &self,
        metrics: &PipelineMetrics,
        source: S,
        parser: P,
        sink: K,
    ) -> Result<PipelineReport>
    where
        S: RecordSource + Send,
        P: RecordParser + Send,
        K: ResultSink + Send,
    {
        let queue = BoundedQueue::new(self.config.queue_capacity)?;
        let aggregator =
            WindowAggregator::new(self.config.window_duration_ms, self.config.top_n)?;
        let start = Instant::now();

        info!(
            queue_capacity = self.config.queue_capacity,
            window_duration_ms = self.config.window_duration_ms,
            top_n = self.config.top_n,
            "Starting pipeline"
        );

        let queue_ref = &queue;
        let ingestor = Ingestor::new(source, parser, metrics);

        let (ingest, analysis) = thread::scope(|scope| {
            let ingest = thread::Builder::new()
                .name("ingest".to_string())
                .spawn_scoped(scope, move || ingest_loop(ingestor, queue_ref))?;

            let analysis = thread::Builder::new()
                .name("analysis".to_string())
                .spawn_scoped(scope, move || {
                    Analyzer {
                        aggregator,
                        sink,
                        metrics,
                    }
                    .run(queue_ref)
                });

            let analysis = match analysis {
                Ok(handle) => handle,
                Err(e) => {
                    // Unblock the ingest thread before the scope joins it
                    queue_ref.close();
                    let _ = ingest.join();
                    return Err(Error::Io(e));
                },
            };

            Ok::<_, Error>((ingest.join(), analysis.join()))
        })?;

        let elapsed = start.elapsed();
        let aggregator = analysis.map_err(|_| Error::WorkerPanicked("analysis"))?;
        let ingest = ingest.map_err(|_| Error::WorkerPanicked("ingest"))?;

        let report = self.report(metrics, Some(queue.stats()), aggregator, elapsed);
        ingest?;
        Ok(report)
    }

    /// Read, aggregate and emit on the calling thread
    ///
    /// Same windows and ordering as [`run`](Self::run), without the queue
    /// or a second thread. `records_enqueued` stays zero.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` for an invalid configuration
    /// - `Error::Source` if the source failed, after the buffered window
    ///   has been flushed
    pub fn run_sequential<S, P, K>(&self, source: S, parser: P, sink: K) -> Result<PipelineReport>
    where
        S: RecordSource,
        P: RecordParser,
        K: ResultSink,
    {
        let aggregator =
            WindowAggregator::new(self.config.window_duration_ms, self.config.top_n)?;
        let metrics = PipelineMetrics::new();
        let start = Instant::now();

        info!(
            window_duration_ms = self.config.window_duration_ms,
            top_n = self.config.top_n,
            "Starting sequential run"
        );

        let mut ingestor = Ingestor::new(source, parser, &metrics);
        let mut analyzer = Analyzer {
            aggregator,
            sink,
            metrics: &metrics,
        };

        let outcome = loop {
            match ingestor.next_record() {
                Ok(Some(record)) => analyzer.process(record),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let aggregator = analyzer.finish();

        let report = self.report(&metrics, None, aggregator, start.elapsed());
        outcome?;
        Ok(report)
    }

    fn report(
        &self,
        metrics: &PipelineMetrics,
        queue: Option<QueueStats>,
        aggregator: AggregatorStats,
        elapsed: Duration,
    ) -> PipelineReport {
        let report = PipelineReport {
            metrics: metrics.snapshot(),
            queue,
            aggregator,
            elapsed,
        };

        info!(
            lines_read = report.metrics.lines_read,
            records_skipped = report.metrics.records_skipped,
            skip_rate = report.metrics.skip_rate(),
            records_analyzed = report.metrics.records_analyzed,
            windows_emitted = report.metrics.windows_emitted,
            blocked_pushes = report.queue.as_ref().map_or(0, |q| q.blocked_pushes),
            peak_queue_len = report.queue.as_ref().map_or(0, |q| q.peak_len),
            elapsed_us = elapsed.as_micros() as u64,
            "Pipeline finished"
        );
        report
    }
}

/// Ingest-side state: source, parser and the midnight rollover
struct Ingestor<'a, S, P> {
    source: S,
    parser: P,
    rollover: DayRollover,
    metrics: &'a PipelineMetrics,
    line_no: usize,
}

impl<'a, S: RecordSource, P: RecordParser> Ingestor<'a, S, P> {
    fn new(source: S, parser: P, metrics: &'a PipelineMetrics) -> Self {
        Self {
            source,
            parser,
            rollover: DayRollover::new(),
            metrics,
            line_no: 0,
        }
    }

    /// Next well-formed record, skipping blank and malformed lines
    ///
    /// `Ok(None)` once the source is exhausted.
    fn next_record(&mut self) -> std::result::Result<Option<Record>, SourceError> {
        loop {
            let line = match self.source.next_line() {
                None => {
                    debug!(lines = self.line_no, "Source exhausted");
                    return Ok(None);
                },
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    error!(error = %e, "Source read failed, stopping ingestion");
                    return Err(e);
                },
            };
            self.line_no += 1;
            self.metrics.record_line_read();

            match self.parser.parse(&line) {
                Ok(record) => {
                    self.metrics.record_parsed();
                    return Ok(Some(self.rollover.apply(record)));
                },
                Err(e) if e.is_empty_input() => {
                    trace!(line = self.line_no, "Skipping blank or comment line");
                },
                Err(e) => {
                    self.metrics.record_skipped();
                    warn!(error = %e.at_line(self.line_no), "Skipping malformed line");
                },
            }
        }
    }
}

/// Read, parse and enqueue until the source ends
///
/// The queue is closed on every exit path.
fn ingest_loop<S, P>(
    mut ingestor: Ingestor<'_, S, P>,
    queue: &BoundedQueue<Record>,
) -> std::result::Result<(), SourceError>
where
    S: RecordSource,
    P: RecordParser,
{
    let _close = CloseOnDrop(queue);

    while let Some(record) = ingestor.next_record()? {
        if queue.push(record).is_err() {
            warn!(line = ingestor.line_no, "Queue closed before source was exhausted");
            return Ok(());
        }
        ingestor.metrics.record_enqueued();
    }
    Ok(())
}

/// Analysis-side state, owned by the analysis thread
struct Analyzer<'a, K> {
    aggregator: WindowAggregator,
    sink: K,
    metrics: &'a PipelineMetrics,
}

impl<K: ResultSink> Analyzer<'_, K> {
    fn run(mut self, queue: &BoundedQueue<Record>) -> AggregatorStats {
        let _close = CloseOnDrop(queue);

        while let Ok(record) = queue.pop() {
            self.process(record);

            let mut drained = 0usize;
            while let Ok(record) = queue.try_pop() {
                self.process(record);
                drained += 1;
            }
            if drained > 0 {
                trace!(drained, "Drained queue backlog");
            }
        }

        self.finish()
    }

    fn process(&mut self, record: Record) {
        self.metrics.record_analyzed();
        if let Some(result) = self.aggregator.accept(record) {
            self.deliver(&result);
        }
    }

    /// Flush the open window and hand back the counters
    fn finish(mut self) -> AggregatorStats {
        if let Some(result) = self.aggregator.flush() {
            self.deliver(&result);
        }
        self.aggregator.stats()
    }

    /// Hand a result to the sink; a panicking sink is logged, not fatal
    fn deliver(&mut self, result: &WindowResult) {
        let start = Instant::now();
        let sink = &mut self.sink;

        match panic::catch_unwind(AssertUnwindSafe(|| sink.emit(result))) {
            Ok(()) => self.metrics.record_window_emitted(start.elapsed()),
            Err(_) => {
                self.metrics.record_sink_failure();
                error!(
                    window_start = result.window.start,
                    window_end = result.window.end,
                    "Result sink panicked, continuing"
                );
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::protocol::WhitespaceParser;
    use crate::ingestion::source::VecSource;

    fn config(capacity: usize, window_ms: i64, top_n: usize) -> PipelineConfig {
        PipelineConfig {
            queue_capacity: capacity,
            window_duration_ms: window_ms,
            top_n,
        }
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        assert!(matches!(
            Pipeline::new(config(0, 60_000, 1)),
            Err(Error::Configuration(_))
        ));
        assert!(Pipeline::new(config(1, 0, 1)).is_err());
        assert!(Pipeline::new(config(1, 60_000, 0)).is_err());
    }

    #[test]
    fn test_empty_source() {
        let pipeline = Pipeline::new(config(2, 60_000, 3)).unwrap();
        let mut count = 0;
        let report = pipeline
            .run(VecSource::new(Vec::<String>::new()), WhitespaceParser::new(), |_: &WindowResult| {
                count += 1
            })
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(report.metrics.lines_read, 0);
        assert_eq!(report.aggregator.windows_emitted, 0);
        assert!(report.queue.unwrap().closed);
    }

    #[test]
    fn test_repeated_runs_report_per_run_counters() {
        let pipeline = Pipeline::new(config(2, 60_000, 1)).unwrap();

        for _ in 0..2 {
            let report = pipeline
                .run(VecSource::new(["00:00:01 A 1"]), WhitespaceParser::new(), |_: &WindowResult| {})
                .unwrap();

            assert_eq!(report.metrics.lines_read, 1);
            assert_eq!(report.metrics.windows_emitted, 1);
            assert_eq!(report.aggregator.windows_emitted, 1);
            assert_eq!(report.queue.unwrap().total_pushed, 1);
        }
    }

    #[test]
    fn test_caller_owned_metrics_handle() {
        let pipeline = Pipeline::new(config(2, 60_000, 1)).unwrap();
        let metrics = PipelineMetrics::new();

        let report = pipeline
            .run_with_metrics(
                &metrics,
                VecSource::new(["00:00:01 A 1", "bad line"]),
                WhitespaceParser::new(),
                |_: &WindowResult| {},
            )
            .unwrap();

        assert_eq!(metrics.lines_read(), 2);
        assert_eq!(metrics.records_skipped(), 1);
        assert_eq!(report.metrics.lines_read, 2);
    }

    #[test]
    fn test_sequential_matches_threaded() {
        let lines = [
            "23:10 A 5",
            "23:50 B 6",
            "not a reading",
            "00:10 C 90",
            "00:20 D 90",
            "01:10 E 7",
        ];
        let pipeline = Pipeline::new(config(1, 3_600_000, 2)).unwrap();

        let mut threaded = Vec::new();
        let threaded_report = pipeline
            .run(VecSource::new(lines), WhitespaceParser::new(), |r: &WindowResult| {
                threaded.push(r.clone())
            })
            .unwrap();

        let mut sequential = Vec::new();
        let sequential_report = pipeline
            .run_sequential(VecSource::new(lines), WhitespaceParser::new(), |r: &WindowResult| {
                sequential.push(r.clone())
            })
            .unwrap();

        assert_eq!(threaded, sequential);
        assert_eq!(sequential.len(), 3);
        assert!(sequential_report.queue.is_none());
        assert_eq!(sequential_report.metrics.records_enqueued, 0);
        assert_eq!(sequential_report.metrics.records_skipped, 1);
        assert_eq!(sequential_report.aggregator, threaded_report.aggregator);
    }

    #[test]
    fn test_sequential_source_error_after_flush() {
        struct Broken(VecSource);

        impl RecordSource for Broken {
            fn next_line(&mut self) -> Option<std::result::Result<String, SourceError>> {
                self.0.next_line().or_else(|| {
                    Some(Err(SourceError::Read {
                        line: 2,
                        source: std::io::Error::new(std::io::ErrorKind::Other, "gone"),
                    }))
                })
            }
        }

        let pipeline = Pipeline::new(config(1, 60_000, 1)).unwrap();
        let mut windows = 0;
        let result = pipeline.run_sequential(
            Broken(VecSource::new(["00:00:01 A 1"])),
            WhitespaceParser::new(),
            |_: &WindowResult| windows += 1,
        );

        assert!(matches!(result, Err(Error::Source(_))));
        assert_eq!(windows, 1);
    }

    #[test]
    fn test_sink_panic_does_not_stop_analysis() {
        let pipeline = Pipeline::new(config(2, 60_000, 1)).unwrap();
        let source = VecSource::new(["00:00:01 A 1", "00:01:01 B 2", "00:02:01 C 3"]);

        let mut seen = Vec::new();
        let mut calls = 0;
        let report = pipeline
            .run(source, WhitespaceParser::new(), |r: &WindowResult| {
                calls += 1;
                if calls == 1 {
                    panic!("sink exploded");
                }
                seen.push(r.records[0].source_id.clone());
            })
            .unwrap();

        assert_eq!(seen, vec!["B", "C"]);
        assert_eq!(report.metrics.sink_failures, 1);
        assert_eq!(report.metrics.windows_emitted, 2);
        assert_eq!(report.aggregator.windows_emitted, 3);
    }
}
