//! Record parsing
//!
//! Turns raw source lines into [`Record`]s. The ingestion loop treats every
//! [`ParseError`] as recoverable: the line is logged and skipped, the
//! stream continues.
//!
//! # Example
//!
//! ```rust
//! use kuba_congestion::ingestion::protocol::{RecordParser, WhitespaceParser};
//!
//! let parser = WhitespaceParser::new();
//! let record = parser.parse("08:15 TL-4 37")?;
//! assert_eq!(record.source_id, "TL-4");
//! assert_eq!(record.metric, 37);
//! # Ok::<(), kuba_congestion::ingestion::protocol::ParseError>(())
//! ```

pub mod error;
pub mod line;

pub use error::{ParseError, ParseErrorKind};
pub use line::{parse_timestamp, WhitespaceParser, WhitespaceParserConfig};

use crate::types::Record;

/// Converts one raw line into a record
///
/// Implementations must be cheap to call per line and must not panic on
/// malformed input.
pub trait RecordParser {
    /// Parse a single line
    fn parse(&self, line: &str) -> Result<Record, ParseError>;
}

impl<P: RecordParser + ?Sized> RecordParser for &P {
    fn parse(&self, line: &str) -> Result<Record, ParseError> {
        (**self).parse(line)
    }
}

impl<P: RecordParser + ?Sized> RecordParser for Box<P> {
    fn parse(&self, line: &str) -> Result<Record, ParseError> {
        (**self).parse(line)
    }
}
