//! Result sinks
//!
//! A [`ResultSink`] receives each completed window. Sinks own their failure
//! handling: `emit` has no return value, and write errors are logged and
//! swallowed so the analysis loop keeps running.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{format_timestamp, Record, WindowResult};

/// Consumer of completed window results
pub trait ResultSink {
    /// Deliver one window result
    fn emit(&mut self, result: &WindowResult);
}

impl<F> ResultSink for F
where
    F: FnMut(&WindowResult),
{
    fn emit(&mut self, result: &WindowResult) {
        self(result)
    }
}

/// Report layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report blocks
    #[default]
    Text,
    /// One JSON object per window (JSON lines)
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown output format '{}', expected 'text' or 'json'",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// JSON view of one window
#[derive(Serialize)]
struct JsonWindow<'a> {
    window_start: String,
    window_end: String,
    window_start_ms: i64,
    window_end_ms: i64,
    total_records: usize,
    top: &'a [Record],
}

/// Writes window reports to any `Write` (stdout by default)
pub struct ConsoleSink<W: Write> {
    writer: W,
    format: OutputFormat,
    write_errors: u64,
}

impl ConsoleSink<io::Stdout> {
    /// Report to standard output
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Report to the given writer
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            write_errors: 0,
        }
    }

    /// Number of failed writes so far
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Consume the sink and return the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_text(&mut self, result: &WindowResult) -> io::Result<()> {
        let w = &mut self.writer;
        writeln!(
            w,
            "Time: {} - {}\n",
            format_timestamp(result.window.start),
            format_timestamp(result.window.end)
        )?;
        writeln!(w, "Max Number Of Cars Crossed Through\n")?;
        for record in &result.records {
            writeln!(w, "Traffic Light ID: {}", record.source_id)?;
            writeln!(w, "Number Of Cars Passed: {}\n", record.metric)?;
        }
        writeln!(w, "--------------------------------------\n")?;
        w.flush()
    }

    fn write_json(&mut self, result: &WindowResult) -> io::Result<()> {
        let view = JsonWindow {
            window_start: format_timestamp(result.window.start),
            window_end: format_timestamp(result.window.end),
            window_start_ms: result.window.start,
            window_end_ms: result.window.end,
            total_records: result.total_records,
            top: &result.records,
        };
        serde_json::to_writer(&mut self.writer, &view)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write> ResultSink for ConsoleSink<W> {
    fn emit(&mut self, result: &WindowResult) {
        let outcome = match self.format {
            OutputFormat::Text => self.write_text(result),
            OutputFormat::Json => self.write_json(result),
        };

        if let Err(e) = outcome {
            self.write_errors += 1;
            warn!(
                error = %e,
                window_start = result.window.start,
                "Failed to write window result"
            );
        }
    }
}

/// Emits window results as structured log events
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ResultSink for LogSink {
    fn emit(&mut self, result: &WindowResult) {
        for (rank, record) in result.records.iter().enumerate() {
            info!(
                window_start = %format_timestamp(result.window.start),
                window_end = %format_timestamp(result.window.end),
                rank = rank + 1,
                source_id = %record.source_id,
                metric = record.metric,
                "Congested sensor"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Window;

    fn sample() -> WindowResult {
        WindowResult {
            window: Window {
                start: 8 * 3_600_000,
                end: 9 * 3_600_000,
            },
            records: vec![
                Record::new(8 * 3_600_000 + 60_000, "TL-3", 40),
                Record::new(8 * 3_600_000, "TL-1", 12),
            ],
            total_records: 5,
        }
    }

    #[test]
    fn test_text_report_layout() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::Text);
        sink.emit(&sample());

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.starts_with("Time: 08:00:00 - 09:00:00\n"));
        assert!(out.contains("Max Number Of Cars Crossed Through"));

        let first = out.find("Traffic Light ID: TL-3").unwrap();
        let second = out.find("Traffic Light ID: TL-1").unwrap();
        assert!(first < second);
        assert!(out.contains("Number Of Cars Passed: 40"));
        assert!(out.contains("--------------------------------------"));
    }

    #[test]
    fn test_json_report() {
        let mut sink = ConsoleSink::new(Vec::new(), OutputFormat::Json);
        sink.emit(&sample());

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out.lines().count(), 1);

        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["window_start"], "08:00:00");
        assert_eq!(value["total_records"], 5);
        assert_eq!(value["top"][0]["source_id"], "TL-3");
        assert_eq!(value["top"][1]["metric"], 12);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let mut sink = ConsoleSink::new(BrokenPipe, OutputFormat::Text);
        sink.emit(&sample());
        sink.emit(&sample());
        assert_eq!(sink.write_errors(), 2);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("TEXT".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_log_sink_as_pipeline_sink() {
        use crate::config::PipelineConfig;
        use crate::ingestion::{VecSource, WhitespaceParser};
        use crate::pipeline::Pipeline;

        let report = Pipeline::new(PipelineConfig::default())
            .unwrap()
            .run(VecSource::new(["08:00 TL-1 4"]), WhitespaceParser::new(), LogSink)
            .unwrap();
        assert_eq!(report.metrics.windows_emitted, 1);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |r: &WindowResult| seen.push(r.total_records);
            sink.emit(&sample());
        }
        assert_eq!(seen, vec![5]);
    }
}
