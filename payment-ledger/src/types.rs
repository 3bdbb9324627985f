//! Core types for the payment ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a payment attempt
///
/// `Unknown` means terminal communication was interrupted before a
/// definitive authorization result arrived; the true outcome is unresolved
/// until out-of-band reconciliation closes it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AttemptStatus {
    /// Dispatched to the terminal, no response yet
    Sent = 1,
    /// Authorization approved
    Approved = 2,
    /// Card declined by the host
    Declined = 3,
    /// Attempt failed for a non-ambiguous reason (bad response shape, ...)
    Error = 4,
    /// Communication lost, outcome unknown; flagged for reconciliation
    Unknown = 5,
    /// Approved attempt voided after the fact
    Voided = 6,
    /// Approved attempt refunded after the fact
    Refunded = 7,
}

impl AttemptStatus {
    /// Wire form (`SENT`, `APPROVED`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Sent => "SENT",
            AttemptStatus::Approved => "APPROVED",
            AttemptStatus::Declined => "DECLINED",
            AttemptStatus::Error => "ERROR",
            AttemptStatus::Unknown => "UNKNOWN",
            AttemptStatus::Voided => "VOIDED",
            AttemptStatus::Refunded => "REFUNDED",
        }
    }

    /// Parse from the wire form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SENT" => Some(AttemptStatus::Sent),
            "APPROVED" => Some(AttemptStatus::Approved),
            "DECLINED" => Some(AttemptStatus::Declined),
            "ERROR" => Some(AttemptStatus::Error),
            "UNKNOWN" => Some(AttemptStatus::Unknown),
            "VOIDED" => Some(AttemptStatus::Voided),
            "REFUNDED" => Some(AttemptStatus::Refunded),
            _ => None,
        }
    }

    /// Whether the attempt state machine permits `self -> next`.
    ///
    /// Re-recording the same status is always permitted so a failed write
    /// can be retried idempotently. `Unknown` may be closed out
    /// retroactively as `Approved` or `Declined` once the settlement batch
    /// says which one actually happened; the ledger itself never does that
    /// resolution.
    pub fn can_transition_to(self, next: AttemptStatus) -> bool {
        use AttemptStatus::*;
        if self == next {
            return true;
        }
        match self {
            Sent => matches!(next, Approved | Declined | Error | Unknown),
            Approved => matches!(next, Voided | Refunded),
            Unknown => matches!(next, Approved | Declined),
            Declined | Error | Voided | Refunded => false,
        }
    }

    /// Whether this status requires out-of-band reconciliation.
    pub fn needs_reconciliation(self) -> bool {
        self == AttemptStatus::Unknown
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored payment attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAttempt {
    /// Caller-supplied idempotency key, globally unique
    pub transaction_id: String,

    /// Current status
    pub status: AttemptStatus,

    /// Amount in cents, immutable once set
    pub amount_cents: i64,

    /// Host authorization code
    pub auth_code: Option<String>,

    /// Last four digits of the card number
    pub card_last4: Option<String>,

    /// Card brand
    pub card_brand: Option<String>,

    /// Terminal the attempt was dispatched to
    pub terminal_id: Option<String>,

    /// Failure or decline reason
    pub reason: Option<String>,

    /// Station the attempt originated from
    pub station_id: Option<String>,

    /// Location the attempt originated from
    pub location_id: Option<String>,

    /// User who initiated the attempt
    pub user_id: String,

    /// Created timestamp, immutable once set
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied with a `record` call
///
/// Only provided fields are applied on update; `None` leaves the stored
/// value untouched. `amount_cents` and `user_id` are required on insert and
/// immutable afterwards (`amount_cents` by invariant, `user_id` as the
/// original submitter).
#[derive(Debug, Clone, Default)]
pub struct RecordUpdate {
    /// Amount in cents (insert only)
    pub amount_cents: Option<i64>,
    /// Host authorization code
    pub auth_code: Option<String>,
    /// Last four digits of the card number
    pub card_last4: Option<String>,
    /// Card brand
    pub card_brand: Option<String>,
    /// Terminal id
    pub terminal_id: Option<String>,
    /// Failure or decline reason
    pub reason: Option<String>,
    /// Station id
    pub station_id: Option<String>,
    /// Location id
    pub location_id: Option<String>,
    /// Submitting user (insert only)
    pub user_id: Option<String>,
}

/// Authorization boundary for queries
///
/// Station operators see only their location; platform admins see all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Unrestricted (platform admin)
    Platform,
    /// Restricted to one location
    Location(String),
}

impl Scope {
    /// Whether this scope may see the given attempt.
    pub fn permits(&self, attempt: &PaymentAttempt) -> bool {
        match self {
            Scope::Platform => true,
            Scope::Location(id) => attempt.location_id.as_deref() == Some(id.as_str()),
        }
    }
}

/// Query filter for `list_by_filter`
#[derive(Debug, Clone, Default)]
pub struct AttemptFilter {
    /// Restrict to one status
    pub status: Option<AttemptStatus>,
    /// Restrict to one transaction id
    pub transaction_id: Option<String>,
    /// Maximum rows to return
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttemptStatus::*;

    #[test]
    fn test_sent_fans_out() {
        for next in [Approved, Declined, Error, Unknown] {
            assert!(Sent.can_transition_to(next));
        }
        assert!(!Sent.can_transition_to(Voided));
        assert!(!Sent.can_transition_to(Refunded));
    }

    #[test]
    fn test_approved_reversals() {
        assert!(Approved.can_transition_to(Voided));
        assert!(Approved.can_transition_to(Refunded));
        assert!(!Approved.can_transition_to(Declined));
        assert!(!Approved.can_transition_to(Unknown));
    }

    #[test]
    fn test_unknown_closes_out_retroactively() {
        assert!(Unknown.can_transition_to(Approved));
        assert!(Unknown.can_transition_to(Declined));
        assert!(!Unknown.can_transition_to(Error));
        assert!(!Unknown.can_transition_to(Sent));
    }

    #[test]
    fn test_terminal_states_stay_put() {
        for from in [Declined, Error, Voided, Refunded] {
            for to in [Sent, Approved, Declined, Error, Unknown, Voided, Refunded] {
                assert_eq!(from.can_transition_to(to), from == to);
            }
        }
    }

    #[test]
    fn test_same_status_is_idempotent() {
        for status in [Sent, Approved, Declined, Error, Unknown, Voided, Refunded] {
            assert!(status.can_transition_to(status));
        }
    }

    #[test]
    fn test_parse_round_trip() {
        for status in [Sent, Approved, Declined, Error, Unknown, Voided, Refunded] {
            assert_eq!(AttemptStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AttemptStatus::parse("NOPE"), None);
        assert_eq!(AttemptStatus::parse("sent"), None);
    }

    #[test]
    fn test_scope_permits() {
        let attempt = PaymentAttempt {
            transaction_id: "tx-1".into(),
            status: Sent,
            amount_cents: 500,
            auth_code: None,
            card_last4: None,
            card_brand: None,
            terminal_id: None,
            reason: None,
            station_id: Some("st-1".into()),
            location_id: Some("loc-1".into()),
            user_id: "u-1".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(Scope::Platform.permits(&attempt));
        assert!(Scope::Location("loc-1".into()).permits(&attempt));
        assert!(!Scope::Location("loc-2".into()).permits(&attempt));
    }
}
