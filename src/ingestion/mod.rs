//! Ingestion side of the pipeline
//!
//! Everything between the raw input and the hand-off to analysis.
//!
//! # Architecture
//!
//! ```text
//! [RecordSource] → [RecordParser] → [BoundedQueue] → (analysis thread)
//!        ↓                ↓                ↓
//!                    [PipelineMetrics]
//! ```
//!
//! # Components
//!
//! - **Source**: finite, single-pass line producers (file, stdin, memory)
//! - **Protocol**: line → [`Record`](crate::types::Record) parsing with
//!   skip-and-continue error semantics
//! - **Rollover**: keeps time-of-day streams continuous across midnight
//! - **Queue**: capacity-bounded blocking FIFO providing backpressure
//! - **Metrics**: lock-free counters for both pipeline loops

pub mod metrics;
pub mod protocol;
pub mod queue;
pub mod rollover;
pub mod source;

pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use protocol::{ParseError, ParseErrorKind, RecordParser, WhitespaceParser};
pub use queue::{BoundedQueue, QueueStats, MAX_QUEUE_CAPACITY};
pub use rollover::DayRollover;
pub use source::{LineSource, RecordSource, VecSource};
