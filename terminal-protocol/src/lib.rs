//! Terminal wire protocol
//!
//! Frame codec for the card-terminal ECR protocol: doubly text-encoded
//! frames with an XOR longitudinal redundancy check.
//!
//! # Architecture
//!
//! - **Wire stage** ([`codec`]): delimiter splicing, per-field and
//!   whole-frame base64, LRC trailer
//! - **Schema stage** ([`schema`], [`frame`]): fixed per-command segment
//!   layouts, typed request/response frames
//! - **Checksum unit** ([`lrc`]): pure XOR fold
//!
//! # Invariants
//!
//! - Round-trip: `decode(encode(frame)) == frame`, field for field
//! - Positional fields: an empty field still occupies its delimiter slot
//! - Integrity first: the LRC is recomputed over recovered raw bytes before
//!   any field value is surfaced

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod codec;
pub mod error;
pub mod frame;
pub mod lrc;
pub mod schema;

// Re-exports
pub use error::{ProtocolError, Result};
pub use frame::{
    CommandFrame, FieldGroup, ResponseFrame, SaleRequest, APPROVED_RESPONSE_CODE,
    PROTOCOL_VERSION, SALE_COMMAND, SALE_RESPONSE_COMMAND, TRANSACTION_TYPE_SALE,
};
pub use lrc::lrc;
