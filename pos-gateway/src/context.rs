//! Pre-authorized caller context
//!
//! The fronting auth layer authenticates the caller and forwards identity
//! in `X-Caller-*` headers; the gateway trusts them and never touches
//! session storage. Station callers are confined to their own location on
//! queries; platform callers see everything.

use crate::errors::GatewayError;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use payment_ledger::Scope;
use std::future::{ready, Ready};

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerRole {
    /// Platform administrator, unrestricted queries
    Platform,
    /// Station operator, confined to its location
    Station,
}

/// Identity and authorization boundary of the calling principal
#[derive(Debug, Clone)]
pub struct CallerContext {
    /// User id, required for mutating calls
    pub user_id: Option<String>,
    /// Caller role, defaults to station
    pub role: CallerRole,
    /// Station the caller operates
    pub station_id: Option<String>,
    /// Location the caller belongs to
    pub location_id: Option<String>,
}

impl CallerContext {
    /// User id, or a 400 for mutating routes that need one
    pub fn require_user(&self) -> Result<&str, GatewayError> {
        self.user_id
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(GatewayError::MissingField("X-Caller-User"))
    }

    /// Authorization boundary for ledger queries
    pub fn scope(&self) -> Result<Scope, GatewayError> {
        match self.role {
            CallerRole::Platform => Ok(Scope::Platform),
            CallerRole::Station => self
                .location_id
                .clone()
                .filter(|l| !l.is_empty())
                .map(Scope::Location)
                .ok_or(GatewayError::MissingField("X-Caller-Location")),
        }
    }
}

fn header(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|v| !v.is_empty())
}

impl FromRequest for CallerContext {
    type Error = GatewayError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let role = match header(req, "X-Caller-Role").as_deref() {
            Some("platform") => CallerRole::Platform,
            _ => CallerRole::Station,
        };
        ready(Ok(CallerContext {
            user_id: header(req, "X-Caller-User"),
            role,
            station_id: header(req, "X-Caller-Station"),
            location_id: header(req, "X-Caller-Location"),
        }))
    }
}
