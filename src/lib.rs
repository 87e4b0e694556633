//! Kuba Congestion - windowed top-N monitor for traffic sensor streams
//!
//! This library provides:
//! - A capacity-bounded blocking queue that throttles producers instead of
//!   dropping data
//! - Tumbling-window top-N aggregation with deterministic ranking
//! - A two-thread ingestion/analysis pipeline with cooperative shutdown
//! - Pluggable record sources, parsers and result sinks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Record sources, parsing, the bounded hand-off queue and metrics
pub mod ingestion;

/// Windowed top-N aggregation
pub mod aggregation;

/// Result sinks (console text/JSON, structured logs)
pub mod sink;

/// Two-thread pipeline wiring and shutdown
pub mod pipeline;

// Re-export main types
pub use aggregation::WindowAggregator;
pub use config::{ApplicationConfig, PipelineConfig};
pub use error::{Error, Result};
pub use ingestion::BoundedQueue;
pub use pipeline::{Pipeline, PipelineReport};
pub use types::{Record, Timestamp, Window, WindowResult};
