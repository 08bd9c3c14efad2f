//! Unified error handling for tgbridged.
//!
//! Only one failure class escalates: a socket-level failure terminates the
//! whole process (there is exactly one client and no reconnect path).
//! Everything else - undecodable lines, Telegram refusals, malformed
//! commands - is handled where it happens and logged.

use thiserror::Error;

/// Fatal bridge errors. Reaching `main` with one of these ends the process.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The client socket failed or closed (receive error, zero-length read,
    /// send error).
    #[error("socket failure: {0}")]
    Socket(#[from] std::io::Error),

    /// The line framer hit a non-recoverable protocol error.
    #[error("protocol failure: {0}")]
    Protocol(#[from] tgbridge_proto::ProtocolError),

    /// The writer task is gone, so nothing can reach the client anymore.
    #[error("socket writer task terminated")]
    WriterClosed,
}
