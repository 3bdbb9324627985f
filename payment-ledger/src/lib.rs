//! Payment idempotency ledger
//!
//! Durable record of every payment attempt, keyed by a caller-supplied
//! transaction id, with the attempt state machine and the reconciliation
//! surface for ambiguous outcomes.
//!
//! # Invariants
//!
//! - One record per transaction id; repeated submissions upsert, never
//!   duplicate
//! - `amount_cents` and `created_at` are immutable once set; records are
//!   never deleted
//! - Status transitions follow the attempt state machine; `UNKNOWN` is a
//!   valid state requiring out-of-band reconciliation, never auto-resolved
//! - A record write is all-or-nothing; alerting is best-effort and never
//!   fails the primary write

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod alert;
pub mod config;
pub mod error;
pub mod ledger;
pub mod storage;
pub mod types;

// Re-exports
pub use alert::{AlertRecord, AlertSink, LogAlertSink};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{Ledger, DEFAULT_QUERY_LIMIT};
pub use types::{AttemptFilter, AttemptStatus, PaymentAttempt, RecordUpdate, Scope};
