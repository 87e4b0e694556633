//! Error types for the congestion monitor

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (fatal, raised before any processing starts)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The record source failed
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A pipeline worker thread panicked
    #[error("Worker thread '{0}' panicked")]
    WorkerPanicked(&'static str),
}

/// Record source errors
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source could not be opened
    #[error("Failed to open {path}: {source}")]
    Open {
        /// Path that failed to open
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Reading a line failed
    #[error("Read failed at line {line}: {source}")]
    Read {
        /// 1-indexed line number of the failed read
        line: usize,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Returned by a blocking pop once the queue is closed and drained
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("queue closed")]
pub struct QueueClosed;

/// Returned by a push into a closed queue; hands the rejected item back
#[derive(Error, Clone, Copy, PartialEq, Eq)]
#[error("push into closed queue")]
pub struct PushError<T>(
    /// The rejected item
    pub T,
);

impl<T> PushError<T> {
    /// Recover the item that could not be pushed
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual Debug so T does not need to be Debug
impl<T> std::fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PushError(..)")
    }
}

/// Non-blocking pop outcome when no item is returned
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryPopError {
    /// Queue is open but currently holds no items
    #[error("queue empty")]
    Empty,

    /// Queue is closed and fully drained
    #[error("queue closed")]
    Closed,
}

/// Validation errors
///
/// Error type for configuration and input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value is out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name being validated
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Invalid format
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat {
        /// Field name being validated
        field: String,
        /// Description of the format error
        message: String,
    },
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_becomes_configuration() {
        let err: Error = ValidationError::OutOfRange {
            field: "top_n".to_string(),
            value: "0".to_string(),
            min: "1".to_string(),
            max: "10000".to_string(),
        }
        .into();

        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("top_n value 0"));
    }

    #[test]
    fn test_source_error_converts() {
        let err: Error = SourceError::Read {
            line: 3,
            source: std::io::Error::new(std::io::ErrorKind::Other, "unplugged"),
        }
        .into();

        assert!(matches!(err, Error::Source(SourceError::Read { line: 3, .. })));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_push_error_returns_item() {
        let err = PushError(42u32);
        assert_eq!(err.into_inner(), 42);
    }
}
