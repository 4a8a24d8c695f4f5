//! Error types for purrtop.
//!
//! Most of these never reach the user: reader failures are absorbed by
//! [`Guarded`](crate::collectors::Guarded) and show up as 0% on screen.
//! Only [`MonitorError::Terminal`] ends the frame loop.

use std::io;
use thiserror::Error;

/// Error type for monitor operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A reader could not open its native query at startup.
    #[error("reader '{0}' is not available on this system")]
    ReaderUnavailable(&'static str),

    /// A single read from an open reader failed.
    #[error("failed to sample '{reader}': {message}")]
    SampleFailed {
        /// The reader that failed.
        reader: &'static str,
        /// Error message describing the failure.
        message: String,
    },

    /// A sized native query needs a larger buffer.
    ///
    /// This is the expected first answer of a two-call size negotiation,
    /// not a failure.
    #[error("buffer too small: {required} bytes required")]
    BufferTooSmall {
        /// Number of bytes the host asked for.
        required: usize,
    },

    /// A process could not be opened or read (protected or already gone).
    #[error("access to process {0} denied")]
    AccessDenied(u32),

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// Terminal initialization or rendering error.
    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

impl MonitorError {
    /// Shorthand for [`MonitorError::SampleFailed`].
    pub fn sample(reader: &'static str, message: impl Into<String>) -> Self {
        Self::SampleFailed {
            reader,
            message: message.into(),
        }
    }
}

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_error_includes_line_number() {
        let err = MonitorError::ConfigParse {
            line: 42,
            message: "invalid value".to_string(),
        };
        let display = err.to_string();

        assert!(display.contains("42"), "Error should include line number: {display}");
        assert!(display.contains("invalid value"), "Error should include message: {display}");
    }

    #[test]
    fn test_reader_unavailable_includes_reader_name() {
        let err = MonitorError::ReaderUnavailable("gpu");
        assert!(err.to_string().contains("gpu"));
    }

    #[test]
    fn test_sample_failed_includes_details() {
        let err = MonitorError::sample("cpu", "/proc/stat not readable");
        let display = err.to_string();

        assert!(display.contains("cpu"));
        assert!(display.contains("/proc/stat"));
    }

    #[test]
    fn test_buffer_too_small_includes_size() {
        let err = MonitorError::BufferTooSmall { required: 1184 };
        assert!(err.to_string().contains("1184"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed");
        let err: MonitorError = io_err.into();

        assert!(matches!(err, MonitorError::Terminal(_)));
        assert!(err.to_string().contains("stdout closed"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MonitorError>();
    }
}
