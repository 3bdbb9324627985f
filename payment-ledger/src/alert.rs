//! Operational alerts for ambiguous attempts
//!
//! A transition into `UNKNOWN` raises a best-effort alert: a durable alert
//! row for the reconciliation queue plus a pluggable sink for operational
//! delivery (pager, ops channel). Alert failures never fail the ledger
//! write that triggered them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// A persisted alert referencing an ambiguous attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// Alert id
    pub id: Uuid,

    /// Transaction the alert refers to
    pub transaction_id: String,

    /// Human-readable summary for the triage queue
    pub message: String,

    /// Raised timestamp
    pub created_at: DateTime<Utc>,
}

impl AlertRecord {
    /// Alert for an attempt whose outcome is unknown
    pub fn unresolved(transaction_id: &str, reason: Option<&str>) -> Self {
        let message = match reason {
            Some(reason) => format!(
                "payment attempt {transaction_id} has no confirmed outcome ({reason}); \
                 reconcile against the settlement batch"
            ),
            None => format!(
                "payment attempt {transaction_id} has no confirmed outcome; \
                 reconcile against the settlement batch"
            ),
        };
        Self {
            id: Uuid::new_v4(),
            transaction_id: transaction_id.to_string(),
            message,
            created_at: Utc::now(),
        }
    }
}

/// Delivery channel for operational alerts
pub trait AlertSink: Send + Sync {
    /// Deliver an alert. Failures are logged by the caller, never
    /// propagated into the ledger write.
    fn raise(&self, alert: &AlertRecord) -> Result<(), String>;
}

/// Default sink: structured warning in the service log
#[derive(Debug, Clone, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn raise(&self, alert: &AlertRecord) -> Result<(), String> {
        warn!(
            transaction_id = %alert.transaction_id,
            alert_id = %alert.id,
            "{}",
            alert.message
        );
        Ok(())
    }
}
