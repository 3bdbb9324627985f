//! Fixed per-command frame schemas
//!
//! Field and group positions are dictated by the command schema: an empty
//! field still occupies its slot, and a frame with an unknown code or the
//! wrong segment/field counts fails closed.

use crate::error::{ProtocolError, Result};

/// One FS-delimited segment of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentSchema {
    /// A single header field (command code, version, status, ...)
    Single(&'static str),
    /// A US-delimited field group with a fixed slot count
    Group {
        /// Group name
        name: &'static str,
        /// Number of field slots
        fields: usize,
    },
}

/// Wire layout of one command or response
#[derive(Debug, Clone, Copy)]
pub struct FrameSchema {
    /// Command code, e.g. `T00`
    pub code: &'static str,
    /// Index of the segment that carries the code
    pub code_segment: usize,
    /// Segment layout in wire order
    pub segments: &'static [SegmentSchema],
}

use SegmentSchema::{Group, Single};

/// Credit sale request
pub const SALE_REQUEST: FrameSchema = FrameSchema {
    code: "T00",
    code_segment: 0,
    segments: &[
        Single("command"),
        Single("version"),
        Single("transaction_type"),
        Group { name: "amount", fields: 6 },
        Group { name: "account", fields: 12 },
        Group { name: "trace", fields: 6 },
        Group { name: "avs", fields: 3 },
        Group { name: "cashier", fields: 2 },
        Group { name: "commercial", fields: 7 },
        Group { name: "moto_ecommerce", fields: 3 },
        Group { name: "additional", fields: 22 },
    ],
};

/// Credit sale response
pub const SALE_RESPONSE: FrameSchema = FrameSchema {
    code: "T01",
    code_segment: 1,
    segments: &[
        Single("status"),
        Single("command"),
        Single("version"),
        Single("response_code"),
        Single("response_message"),
        Group { name: "host", fields: 6 },
        Single("transaction_type"),
        Group { name: "amount", fields: 6 },
        Group { name: "account", fields: 9 },
        Group { name: "trace", fields: 6 },
    ],
};

const REQUEST_SCHEMAS: &[&FrameSchema] = &[&SALE_REQUEST];
const RESPONSE_SCHEMAS: &[&FrameSchema] = &[&SALE_RESPONSE];

/// Look up a request schema by command code.
pub fn request_schema(code: &str) -> Option<&'static FrameSchema> {
    REQUEST_SCHEMAS.iter().copied().find(|s| s.code == code)
}

/// Look up a response schema by command code.
pub fn response_schema(code: &str) -> Option<&'static FrameSchema> {
    RESPONSE_SCHEMAS.iter().copied().find(|s| s.code == code)
}

impl FrameSchema {
    /// Validate decoded segments against this schema (fail closed).
    pub fn validate(&self, segments: &[Vec<String>]) -> Result<()> {
        if segments.len() != self.segments.len() {
            return Err(ProtocolError::SchemaMismatch(format!(
                "{}: {} segments, schema has {}",
                self.code,
                segments.len(),
                self.segments.len()
            )));
        }
        for (segment, layout) in segments.iter().zip(self.segments) {
            let (name, want) = match layout {
                Single(name) => (*name, 1),
                Group { name, fields } => (*name, *fields),
            };
            if segment.len() != want {
                return Err(ProtocolError::SchemaMismatch(format!(
                    "{}: {} has {} fields, schema has {}",
                    self.code,
                    name,
                    segment.len(),
                    want
                )));
            }
        }
        Ok(())
    }

    /// Number of field slots in the named group.
    pub fn group_len(&self, group: &str) -> usize {
        self.segments
            .iter()
            .find_map(|s| match s {
                Group { name, fields } if *name == group => Some(*fields),
                _ => None,
            })
            .unwrap_or(0)
    }
}
