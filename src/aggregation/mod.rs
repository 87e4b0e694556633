//! Windowed top-N aggregation
//!
//! - **window**: tumbling-window state machine ([`WindowAggregator`])
//! - **topn**: deterministic partial-sort selection ([`select_top_n`])
//!
//! # Example
//!
//! ```rust
//! use kuba_congestion::aggregation::WindowAggregator;
//! use kuba_congestion::types::Record;
//!
//! let mut agg = WindowAggregator::new(60_000, 1)?;
//! assert!(agg.accept(Record::new(10_000, "A", 5)).is_none());
//! assert!(agg.accept(Record::new(50_000, "B", 9)).is_none());
//!
//! let closed = agg.accept(Record::new(65_000, "C", 3)).unwrap();
//! assert_eq!(closed.records[0].source_id, "B");
//!
//! let last = agg.flush().unwrap();
//! assert_eq!(last.records[0].source_id, "C");
//! # Ok::<(), kuba_congestion::Error>(())
//! ```

pub mod topn;
pub mod window;

pub use topn::{congestion_order, select_top_n};
pub use window::{AggregatorStats, WindowAggregator, MAX_TOP_N};
