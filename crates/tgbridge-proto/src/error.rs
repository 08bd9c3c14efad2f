//! Protocol error types.

use thiserror::Error;

/// Errors produced while framing or decoding wire lines.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A line arrived that is not valid UTF-8.
    ///
    /// The offending bytes have already been consumed from the read buffer,
    /// so the caller may log this and keep reading: only the one line is
    /// lost.
    #[error("invalid UTF-8 in line at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// Byte offset of the first invalid sequence.
        byte_pos: usize,
        /// Human-readable decode failure description.
        details: String,
    },

    /// A line (or unterminated partial line) exceeded the length limit.
    #[error("line too long: {actual} bytes (limit {limit})")]
    LineTooLong {
        /// Observed length in bytes.
        actual: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// Underlying transport failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the connection can survive this error.
    ///
    /// A UTF-8 decode failure loses one line; everything else means the
    /// stream itself is no longer trustworthy.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidUtf8 { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;
