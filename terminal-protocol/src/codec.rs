//! Wire stage of the frame codec
//!
//! A frame on the wire is:
//!
//! ```text
//! base64( STX  b64(field) US b64(field) ... FS ... ETX  b64(lrc) )
//! ```
//!
//! Fields are individually base64-encoded (the transport only accepts
//! printable payloads), spliced together with `FS` between segments and `US`
//! between fields of a segment, framed by `STX`/`ETX`, and followed by the
//! LRC of the **raw** (untransformed) bytes, itself base64-encoded. The
//! assembled byte string is then base64-encoded once more as a whole.
//!
//! This stage knows nothing about commands; it maps between bytes and
//! `Vec<Vec<String>>` segments. Layout validation lives in [`crate::schema`].

use crate::error::{ProtocolError, Result};
use crate::lrc::lrc;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

/// Start-of-text marker, excluded from the LRC
pub const STX: u8 = 0x02;
/// End-of-text marker, included in the LRC
pub const ETX: u8 = 0x03;
/// Segment (field group) delimiter
pub const FS: u8 = 0x1C;
/// Field delimiter within a group
pub const US: u8 = 0x1F;

/// Encode segments into a transport payload.
///
/// An empty field contributes no bytes but keeps its delimiter slot, so
/// positions are preserved end to end.
pub fn encode_segments(segments: &[Vec<String>]) -> Result<Vec<u8>> {
    // Raw bytes (post-STX through ETX) accumulate in parallel with the
    // encoded frame; the LRC protects the raw form, not the base64 text.
    let mut raw: Vec<u8> = Vec::new();
    let mut framed: Vec<u8> = vec![STX];

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            raw.push(FS);
            framed.push(FS);
        }
        for (j, field) in segment.iter().enumerate() {
            if j > 0 {
                raw.push(US);
                framed.push(US);
            }
            validate_field(field)?;
            raw.extend_from_slice(field.as_bytes());
            framed.extend_from_slice(BASE64.encode(field.as_bytes()).as_bytes());
        }
    }

    raw.push(ETX);
    framed.push(ETX);

    let check = lrc(&raw);
    framed.extend_from_slice(BASE64.encode([check]).as_bytes());

    Ok(BASE64.encode(&framed).into_bytes())
}

/// Decode a transport payload back into segments.
///
/// Exact inverse of [`encode_segments`]. The LRC is recomputed over the
/// recovered raw bytes and compared against the trailer before any field
/// value is returned; every integrity failure (outer or per-field encoding,
/// framing bytes, trailer, checksum compare) reports as
/// [`ProtocolError::ChecksumMismatch`] so corrupted wire data is never
/// mistaken for a schema problem.
pub fn decode_segments(payload: &[u8]) -> Result<Vec<Vec<String>>> {
    let frame = BASE64
        .decode(payload)
        .map_err(|e| ProtocolError::ChecksumMismatch(format!("outer encoding: {e}")))?;

    if frame.first() != Some(&STX) {
        return Err(ProtocolError::ChecksumMismatch(
            "frame does not start with STX".into(),
        ));
    }
    // Encoded fields are printable and delimiters are control bytes, so the
    // first ETX is the frame terminator.
    let etx = frame
        .iter()
        .position(|&b| b == ETX)
        .ok_or_else(|| ProtocolError::ChecksumMismatch("frame has no ETX".into()))?;

    let trailer = BASE64
        .decode(&frame[etx + 1..])
        .map_err(|e| ProtocolError::ChecksumMismatch(format!("lrc trailer encoding: {e}")))?;
    if trailer.len() != 1 {
        return Err(ProtocolError::ChecksumMismatch(format!(
            "lrc trailer is {} bytes, expected 1",
            trailer.len()
        )));
    }
    let expected = trailer[0];

    let body = &frame[1..etx];
    let mut raw: Vec<u8> = Vec::new();
    let mut segments: Vec<Vec<String>> = Vec::new();

    for (i, segment) in body.split(|&b| b == FS).enumerate() {
        if i > 0 {
            raw.push(FS);
        }
        let mut fields = Vec::new();
        for (j, field) in segment.split(|&b| b == US).enumerate() {
            if j > 0 {
                raw.push(US);
            }
            let bytes = BASE64
                .decode(field)
                .map_err(|e| ProtocolError::ChecksumMismatch(format!("field encoding: {e}")))?;
            raw.extend_from_slice(&bytes);
            let text = String::from_utf8(bytes).map_err(|_| {
                ProtocolError::ChecksumMismatch("field is not valid utf-8".into())
            })?;
            fields.push(text);
        }
        segments.push(fields);
    }

    raw.push(ETX);
    let actual = lrc(&raw);
    if actual != expected {
        return Err(ProtocolError::ChecksumMismatch(format!(
            "lrc {actual:#04x} does not match trailer {expected:#04x}"
        )));
    }

    Ok(segments)
}

fn validate_field(field: &str) -> Result<()> {
    if let Some(c) = field.bytes().find(|b| *b < 0x20) {
        return Err(ProtocolError::EncodeInvalidField {
            group: "field".into(),
            reason: format!("control byte {c:#04x} not allowed in field values"),
        });
    }
    Ok(())
}
