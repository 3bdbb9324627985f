//! HTTP request/response DTOs

use serde::{Deserialize, Serialize};

/// Body of `POST /payments/log`
///
/// Everything is optional at the serde layer so the handler can answer a
/// clean 400 for missing `transactionId`/`status` instead of a
/// deserialization error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPaymentRequest {
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    /// Amount in cents
    pub amount: Option<i64>,
    pub auth_code: Option<String>,
    pub card_last4: Option<String>,
    pub card_brand: Option<String>,
    pub terminal_id: Option<String>,
    pub reason: Option<String>,
    pub station_id: Option<String>,
    pub location_id: Option<String>,
}

/// Query string of `GET /payments/log`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogQuery {
    pub status: Option<String>,
    pub transaction_id: Option<String>,
    pub limit: Option<usize>,
}

/// Body of `POST /payments/submit`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPaymentRequest {
    pub transaction_id: Option<String>,
    /// Amount in cents
    pub amount_cents: Option<i64>,
    pub invoice_number: Option<String>,
    pub reference_number: Option<String>,
}
