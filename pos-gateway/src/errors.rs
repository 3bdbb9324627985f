//! Gateway error type and HTTP mapping

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use payment_ledger::LedgerError;
use serde_json::json;
use terminal_protocol::ProtocolError;
use thiserror::Error;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway errors
///
/// Missing or malformed caller input maps to 400; everything downstream of
/// a well-formed request maps to 500 with a stable error code the POS
/// client can branch on.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("dispatch rate limit exceeded")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::MissingField(_) => "MISSING_FIELD",
            GatewayError::InvalidField(_) => "INVALID_FIELD",
            GatewayError::Protocol(e) => e.code(),
            GatewayError::Ledger(e) => e.code(),
            GatewayError::RateLimited => "RATE_LIMITED",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingField(_) | GatewayError::InvalidField(_) => {
                StatusCode::BAD_REQUEST
            }
            // Encode errors are caller errors (fix and resend); decode
            // errors never reach the HTTP boundary directly — the
            // dispatcher records them as attempt outcomes.
            GatewayError::Protocol(ProtocolError::EncodeInvalidField { .. }) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Protocol(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }))
    }
}
