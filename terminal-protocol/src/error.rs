//! Error types for the terminal protocol

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol errors
///
/// Every failure is typed and synchronous; a frame either decodes completely
/// or not at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Caller supplied a field the schema cannot carry (fatal, fix and resend)
    #[error("invalid field in {group}: {reason}")]
    EncodeInvalidField {
        /// Group (or header segment) the field belongs to
        group: String,
        /// What was wrong with it
        reason: String,
    },

    /// Frame integrity check failed (corrupted wire data)
    #[error("frame integrity check failed: {0}")]
    ChecksumMismatch(String),

    /// Frame is well-formed but matches no known command schema
    #[error("frame does not match a known command schema: {0}")]
    SchemaMismatch(String),
}

impl ProtocolError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::EncodeInvalidField { .. } => "ENCODE_INVALID_FIELD",
            ProtocolError::ChecksumMismatch(_) => "DECODE_CHECKSUM_MISMATCH",
            ProtocolError::SchemaMismatch(_) => "DECODE_SCHEMA_MISMATCH",
        }
    }
}
