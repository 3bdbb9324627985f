//! Transport error types

use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport failures
///
/// All three variants mean the authorization outcome is unknown on this
/// side of the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No complete response within the deadline
    #[error("terminal did not respond within the deadline")]
    Timeout,

    /// Peer closed or reset the connection mid-exchange
    #[error("connection to terminal was reset")]
    ConnectionReset,

    /// Any other transport-level failure (resolution, refusal, io)
    #[error("transport error: {0}")]
    Transport(String),
}

impl TransportError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            TransportError::Timeout => "TRANSPORT_TIMEOUT",
            TransportError::ConnectionReset => "CONNECTION_RESET",
            TransportError::Transport(_) => "TRANSPORT_ERROR",
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                TransportError::ConnectionReset
            }
            ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Transport(err.to_string()),
        }
    }
}
