//! Terminal transport bridge
//!
//! One request/response exchange with a physical card terminal per call,
//! under a hard deadline, with typed transport failures.
//!
//! # Invariants
//!
//! - Exactly one exchange per dispatch; the bridge never auto-retries. A
//!   blind retry against a terminal mid-authorization risks double-charging
//!   the card network; retry policy belongs to callers, gated through the
//!   idempotency ledger.
//! - Every transport failure is ambiguous: the terminal may have completed
//!   the authorization even though the response never arrived. Callers must
//!   map all [`TransportError`] variants to an `UNKNOWN` outcome, never to a
//!   decline.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod bridge;
pub mod error;
pub mod link;

// Re-exports
pub use bridge::TerminalBridge;
pub use error::{Result, TransportError};
pub use link::{TcpLink, TerminalLink};
