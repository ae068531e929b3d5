//! Telemetry Protocol Error Types

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol error types
///
/// Everything except [`ProtocolError::Io`] describes a single malformed
/// record. Those are dropped and the stream keeps going; an I/O error ends
/// the link.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Record did not contain exactly two tokens
    #[error("Invalid data format: expected 2 tokens, got {count} in {line:?}")]
    WrongTokenCount {
        /// Number of whitespace-separated tokens found
        count: usize,
        /// Offending line (truncated)
        line: String,
    },

    /// Token is not a number
    #[error("Invalid number format: {token:?} in {line:?}")]
    InvalidNumber {
        /// Token that failed to parse
        token: String,
        /// Offending line (truncated)
        line: String,
    },

    /// Token parsed to NaN or infinity
    #[error("Non-finite value in {line:?}")]
    NonFinite {
        /// Offending line (truncated)
        line: String,
    },

    /// Line exceeded the configured maximum before a newline arrived
    #[error("Line exceeds {limit} bytes, discarding until next newline")]
    LineTooLong {
        /// Configured limit in bytes
        limit: usize,
    },

    /// Line is not valid UTF-8
    #[error("Record is not valid UTF-8")]
    InvalidUtf8,

    /// Transport read or write failure
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for per-record errors the stream recovers from
    pub fn is_malformed_record(&self) -> bool {
        !matches!(self, ProtocolError::Io(_))
    }
}

/// Longest slice of an offending line kept in diagnostics
pub(crate) const DIAGNOSTIC_LINE_LIMIT: usize = 64;

/// Copy a line for a diagnostic, bounded by [`DIAGNOSTIC_LINE_LIMIT`]
pub(crate) fn diagnostic_line(line: &str) -> String {
    if line.len() <= DIAGNOSTIC_LINE_LIMIT {
        return line.to_string();
    }

    let mut end = DIAGNOSTIC_LINE_LIMIT;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &line[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_classification() {
        let error = ProtocolError::WrongTokenCount {
            count: 3,
            line: "1 2 3".to_string(),
        };
        assert!(error.is_malformed_record());

        let error = ProtocolError::LineTooLong { limit: 256 };
        assert!(error.is_malformed_record());

        let error = ProtocolError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(!error.is_malformed_record());
    }

    #[test]
    fn test_diagnostic_line_truncates_on_char_boundary() {
        let short = "0.1 0.2";
        assert_eq!(diagnostic_line(short), short);

        let long = "é".repeat(100);
        let truncated = diagnostic_line(&long);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= DIAGNOSTIC_LINE_LIMIT + 3);
    }
}
