//! Typed command and response frames
//!
//! The schema stage of the codec: maps between typed frames and the wire
//! stage's segment vectors, failing closed against the fixed per-command
//! schemas in [`crate::schema`].

use crate::codec;
use crate::error::{ProtocolError, Result};
use crate::schema::{self, FrameSchema, SegmentSchema};
use serde::{Deserialize, Serialize};

/// Command code for a credit sale request
pub const SALE_COMMAND: &str = "T00";
/// Command code for a credit sale response
pub const SALE_RESPONSE_COMMAND: &str = "T01";
/// Protocol version emitted by this implementation
pub const PROTOCOL_VERSION: &str = "1.28";
/// Transaction type code for a sale
pub const TRANSACTION_TYPE_SALE: &str = "01";
/// Host response code meaning the authorization was approved
pub const APPROVED_RESPONSE_CODE: &str = "000000";

// Request group positions after the three header segments.
const GROUP_AMOUNT: usize = 0;
const GROUP_TRACE: usize = 2;

// Host group field positions in a response.
const HOST_AUTH_CODE: usize = 2;
const HOST_REFERENCE: usize = 3;
// Account group field positions in a response.
const ACCOUNT_NUMBER: usize = 0;
const ACCOUNT_CARD_BRAND: usize = 6;

/// An ordered group of optional text fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroup(pub Vec<String>);

impl FieldGroup {
    /// A group of `len` empty slots
    pub fn empty(len: usize) -> Self {
        Self(vec![String::new(); len])
    }

    /// Field at `index`, empty string if the slot is blank
    pub fn get(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or("")
    }

    /// Field at `index` as an optional value (blank slot = `None`)
    pub fn get_opt(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str).filter(|s| !s.is_empty())
    }
}

/// Parameters for building a sale command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    /// Amount to authorize, in cents
    pub amount_cents: i64,
    /// POS invoice number
    pub invoice_number: String,
    /// ECR reference number (defaults to `"1"`)
    pub reference_number: Option<String>,
}

/// A command frame addressed to the terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandFrame {
    /// 3-character command code
    pub command: String,
    /// Protocol version
    pub version: String,
    /// Numeric transaction type code
    pub transaction_type: String,
    /// Field groups in schema order
    pub groups: Vec<FieldGroup>,
}

impl CommandFrame {
    /// Build a credit sale (`T00`) command.
    pub fn sale(request: &SaleRequest) -> Result<Self> {
        if request.amount_cents < 0 {
            return Err(ProtocolError::EncodeInvalidField {
                group: "amount".into(),
                reason: format!("amount {} is negative", request.amount_cents),
            });
        }

        let mut groups: Vec<FieldGroup> = schema::SALE_REQUEST.segments[3..]
            .iter()
            .map(|s| match s {
                SegmentSchema::Group { fields, .. } => FieldGroup::empty(*fields),
                SegmentSchema::Single(_) => FieldGroup::empty(1),
            })
            .collect();

        groups[GROUP_AMOUNT].0[0] = request.amount_cents.to_string();
        groups[GROUP_TRACE].0[0] = request
            .reference_number
            .clone()
            .unwrap_or_else(|| "1".to_string());
        groups[GROUP_TRACE].0[1] = request.invoice_number.clone();

        Ok(Self {
            command: SALE_COMMAND.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            transaction_type: TRANSACTION_TYPE_SALE.to_string(),
            groups,
        })
    }

    /// Amount field of the amount group.
    pub fn transaction_amount(&self) -> &str {
        self.groups
            .get(GROUP_AMOUNT)
            .map(|g| g.get(0))
            .unwrap_or("")
    }

    /// Invoice number field of the trace group.
    pub fn invoice_number(&self) -> &str {
        self.groups.get(GROUP_TRACE).map(|g| g.get(1)).unwrap_or("")
    }

    /// Encode into a transport payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let schema = schema::request_schema(&self.command).ok_or_else(|| {
            ProtocolError::EncodeInvalidField {
                group: "command".into(),
                reason: format!("unknown command code {:?}", self.command),
            }
        })?;
        let segments = self.to_segments();
        check_encode_layout(schema, &segments)?;
        codec::encode_segments(&segments)
    }

    /// Decode a transport payload into a command frame.
    ///
    /// Integrity is validated before any field is interpreted; the command
    /// code is then matched against the request schemas, failing closed.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let segments = codec::decode_segments(payload)?;
        let code = single_field(&segments, 0)?;
        let schema = schema::request_schema(code).ok_or_else(|| {
            ProtocolError::SchemaMismatch(format!("unknown command code {code:?}"))
        })?;
        schema.validate(&segments)?;

        let mut iter = segments.into_iter();
        let command = iter.next().unwrap_or_default().remove(0);
        let version = iter.next().unwrap_or_default().remove(0);
        let transaction_type = iter.next().unwrap_or_default().remove(0);
        let groups = iter.map(FieldGroup).collect();

        Ok(Self {
            command,
            version,
            transaction_type,
            groups,
        })
    }

    fn to_segments(&self) -> Vec<Vec<String>> {
        let mut segments = vec![
            vec![self.command.clone()],
            vec![self.version.clone()],
            vec![self.transaction_type.clone()],
        ];
        segments.extend(self.groups.iter().map(|g| g.0.clone()));
        segments
    }
}

/// A response frame from the terminal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFrame {
    /// Terminal acknowledgement status
    pub status: String,
    /// Response command code
    pub command: String,
    /// Protocol version
    pub version: String,
    /// Host response code (`000000` = approved)
    pub response_code: String,
    /// Human-readable host response message
    pub response_message: String,
    /// Host information group
    pub host: FieldGroup,
    /// Transaction type echoed back
    pub transaction_type: String,
    /// Amount information group
    pub amount: FieldGroup,
    /// Account information group
    pub account: FieldGroup,
    /// Trace information group
    pub trace: FieldGroup,
}

impl ResponseFrame {
    /// A sale (`T01`) response skeleton with empty groups; callers fill the
    /// host/account/trace slots they need. Used by terminal simulators and
    /// tests.
    pub fn sale(response_code: &str, response_message: &str) -> Self {
        Self {
            status: "0".to_string(),
            command: SALE_RESPONSE_COMMAND.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            response_code: response_code.to_string(),
            response_message: response_message.to_string(),
            host: FieldGroup::empty(schema::SALE_RESPONSE.group_len("host")),
            transaction_type: TRANSACTION_TYPE_SALE.to_string(),
            amount: FieldGroup::empty(schema::SALE_RESPONSE.group_len("amount")),
            account: FieldGroup::empty(schema::SALE_RESPONSE.group_len("account")),
            trace: FieldGroup::empty(schema::SALE_RESPONSE.group_len("trace")),
        }
    }

    /// Whether the host approved the authorization.
    pub fn approved(&self) -> bool {
        self.response_code == APPROVED_RESPONSE_CODE
    }

    /// Host authorization code, if present.
    pub fn auth_code(&self) -> Option<&str> {
        self.host.get_opt(HOST_AUTH_CODE)
    }

    /// Host reference number for the authorization, if present.
    pub fn host_reference(&self) -> Option<&str> {
        self.host.get_opt(HOST_REFERENCE)
    }

    /// Last four digits of the account number, if reported.
    pub fn card_last4(&self) -> Option<String> {
        self.account.get_opt(ACCOUNT_NUMBER).map(|pan| {
            let chars: Vec<char> = pan.chars().collect();
            let start = chars.len().saturating_sub(4);
            chars[start..].iter().collect()
        })
    }

    /// Card brand, if reported.
    pub fn card_brand(&self) -> Option<&str> {
        self.account.get_opt(ACCOUNT_CARD_BRAND)
    }

    /// Encode into a transport payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let schema = schema::response_schema(&self.command).ok_or_else(|| {
            ProtocolError::EncodeInvalidField {
                group: "command".into(),
                reason: format!("unknown response code {:?}", self.command),
            }
        })?;
        let segments = self.to_segments();
        check_encode_layout(schema, &segments)?;
        codec::encode_segments(&segments)
    }

    /// Decode a transport payload into a response frame.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let segments = codec::decode_segments(payload)?;
        let code = single_field(&segments, 1)?;
        let schema = schema::response_schema(code).ok_or_else(|| {
            ProtocolError::SchemaMismatch(format!("unknown response code {code:?}"))
        })?;
        schema.validate(&segments)?;

        let mut iter = segments.into_iter();
        let status = iter.next().unwrap_or_default().remove(0);
        let command = iter.next().unwrap_or_default().remove(0);
        let version = iter.next().unwrap_or_default().remove(0);
        let response_code = iter.next().unwrap_or_default().remove(0);
        let response_message = iter.next().unwrap_or_default().remove(0);
        let host = FieldGroup(iter.next().unwrap_or_default());
        let transaction_type = iter.next().unwrap_or_default().remove(0);
        let amount = FieldGroup(iter.next().unwrap_or_default());
        let account = FieldGroup(iter.next().unwrap_or_default());
        let trace = FieldGroup(iter.next().unwrap_or_default());

        Ok(Self {
            status,
            command,
            version,
            response_code,
            response_message,
            host,
            transaction_type,
            amount,
            account,
            trace,
        })
    }

    fn to_segments(&self) -> Vec<Vec<String>> {
        vec![
            vec![self.status.clone()],
            vec![self.command.clone()],
            vec![self.version.clone()],
            vec![self.response_code.clone()],
            vec![self.response_message.clone()],
            self.host.0.clone(),
            vec![self.transaction_type.clone()],
            self.amount.0.clone(),
            self.account.0.clone(),
            self.trace.0.clone(),
        ]
    }
}

fn single_field<'a>(segments: &'a [Vec<String>], index: usize) -> Result<&'a str> {
    match segments.get(index) {
        Some(fields) if fields.len() == 1 => Ok(fields[0].as_str()),
        _ => Err(ProtocolError::SchemaMismatch(format!(
            "segment {index} is not a single field"
        ))),
    }
}

// Encode-side layout violations are caller errors, not wire corruption.
fn check_encode_layout(schema: &FrameSchema, segments: &[Vec<String>]) -> Result<()> {
    schema
        .validate(segments)
        .map_err(|e| ProtocolError::EncodeInvalidField {
            group: schema.code.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale_request() -> SaleRequest {
        SaleRequest {
            amount_cents: 1348,
            invoice_number: "INV-1001".to_string(),
            reference_number: None,
        }
    }

    #[test]
    fn test_sale_round_trip() {
        // Scenario: encode a sale for 1348 cents, decode, check the decoded
        // transaction type and amount field.
        let frame = CommandFrame::sale(&sale_request()).unwrap();
        let payload = frame.encode().unwrap();
        let decoded = CommandFrame::decode(&payload).unwrap();

        assert_eq!(decoded, frame);
        assert_eq!(decoded.transaction_type, TRANSACTION_TYPE_SALE);
        assert_eq!(decoded.transaction_amount(), "1348");
        assert_eq!(decoded.invoice_number(), "INV-1001");
    }

    #[test]
    fn test_sale_defaults_reference_number() {
        let frame = CommandFrame::sale(&sale_request()).unwrap();
        assert_eq!(frame.groups[GROUP_TRACE].get(0), "1");
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut request = sale_request();
        request.amount_cents = -5;
        let err = CommandFrame::sale(&request).unwrap_err();
        assert_eq!(err.code(), "ENCODE_INVALID_FIELD");
    }

    #[test]
    fn test_unknown_command_fails_closed_on_encode() {
        let mut frame = CommandFrame::sale(&sale_request()).unwrap();
        frame.command = "Z99".to_string();
        let err = frame.encode().unwrap_err();
        assert_eq!(err.code(), "ENCODE_INVALID_FIELD");
    }

    #[test]
    fn test_wrong_field_count_fails_closed_on_encode() {
        let mut frame = CommandFrame::sale(&sale_request()).unwrap();
        frame.groups[GROUP_AMOUNT].0.push("extra".to_string());
        let err = frame.encode().unwrap_err();
        assert_eq!(err.code(), "ENCODE_INVALID_FIELD");
    }

    #[test]
    fn test_unknown_command_fails_closed_on_decode() {
        let payload = crate::codec::encode_segments(&[
            vec!["Z99".to_string()],
            vec![PROTOCOL_VERSION.to_string()],
            vec![TRANSACTION_TYPE_SALE.to_string()],
        ])
        .unwrap();
        let err = CommandFrame::decode(&payload).unwrap_err();
        assert_eq!(err.code(), "DECODE_SCHEMA_MISMATCH");
    }

    #[test]
    fn test_response_round_trip_with_host_fields() {
        let mut response = ResponseFrame::sale(APPROVED_RESPONSE_CODE, "APPROVED");
        response.host.0[HOST_AUTH_CODE] = "AB12".to_string();
        response.host.0[HOST_REFERENCE] = "000042".to_string();
        response.account.0[ACCOUNT_NUMBER] = "474747******1111".to_string();
        response.account.0[ACCOUNT_CARD_BRAND] = "VISA".to_string();

        let payload = response.encode().unwrap();
        let decoded = ResponseFrame::decode(&payload).unwrap();

        assert_eq!(decoded, response);
        assert!(decoded.approved());
        assert_eq!(decoded.auth_code(), Some("AB12"));
        assert_eq!(decoded.host_reference(), Some("000042"));
        assert_eq!(decoded.card_last4().as_deref(), Some("1111"));
        assert_eq!(decoded.card_brand(), Some("VISA"));
    }

    #[test]
    fn test_declined_response() {
        let response = ResponseFrame::sale("100001", "DECLINED");
        let payload = response.encode().unwrap();
        let decoded = ResponseFrame::decode(&payload).unwrap();

        assert!(!decoded.approved());
        assert_eq!(decoded.response_message, "DECLINED");
        assert_eq!(decoded.auth_code(), None);
        assert_eq!(decoded.card_last4(), None);
    }

    #[test]
    fn test_request_payload_does_not_decode_as_response() {
        let payload = CommandFrame::sale(&sale_request()).unwrap().encode().unwrap();
        let err = ResponseFrame::decode(&payload).unwrap_err();
        assert_eq!(err.code(), "DECODE_SCHEMA_MISMATCH");
    }
}
