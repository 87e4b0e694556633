//! Record parsing error types
//!
//! Provides detailed error types for line parsing failures with context
//! about the offending line.

use std::fmt;

/// Maximum context snippet length kept on an error
const MAX_CONTEXT_LEN: usize = 50;

/// Parse error with location and context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Kind of error that occurred
    pub kind: ParseErrorKind,
    /// Line number where error occurred (1-indexed)
    pub line: Option<usize>,
    /// The problematic input snippet (truncated if too long)
    pub context: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(kind: ParseErrorKind) -> Self {
        Self {
            kind,
            line: None,
            context: None,
        }
    }

    /// Add line number to error
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Add context snippet to error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        self.context = if ctx.chars().count() > MAX_CONTEXT_LEN {
            let truncated: String = ctx.chars().take(MAX_CONTEXT_LEN - 3).collect();
            Some(format!("{}...", truncated))
        } else {
            Some(ctx)
        };
        self
    }

    /// Blank lines and comments: skipped without a warning
    pub fn is_empty_input(&self) -> bool {
        matches!(self.kind, ParseErrorKind::EmptyInput)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }

        if let Some(ref ctx) = self.context {
            write!(f, " near '{}'", ctx)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Kinds of parse errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Blank line or comment
    EmptyInput,

    /// Line exceeds maximum allowed length
    InputTooLarge,

    /// A required field is absent
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// More fields than the format allows
    TrailingInput {
        /// The unexpected extra text
        extra: String,
    },

    /// Timestamp could not be parsed in any accepted format
    InvalidTimestamp {
        /// The raw timestamp text
        value: String,
    },

    /// Metric is not a non-negative integer
    InvalidMetric {
        /// The raw metric text
        value: String,
        /// Description of what's wrong
        reason: String,
    },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::EmptyInput => write!(f, "Empty input"),
            ParseErrorKind::InputTooLarge => write!(f, "Input exceeds maximum line length"),
            ParseErrorKind::MissingField { field } => write!(f, "Missing field '{}'", field),
            ParseErrorKind::TrailingInput { extra } => {
                write!(f, "Unexpected trailing input '{}'", extra)
            },
            ParseErrorKind::InvalidTimestamp { value } => {
                write!(f, "Invalid timestamp '{}'", value)
            },
            ParseErrorKind::InvalidMetric { value, reason } => {
                write!(f, "Invalid metric '{}': {}", value, reason)
            },
        }
    }
}
