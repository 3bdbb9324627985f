//! The idempotency ledger
//!
//! Upsert semantics keyed by the caller-supplied transaction id: the first
//! write creates the attempt, later writes transition its status and merge
//! only the fields they carry. Concurrent writers for the same key
//! serialize through the write section; the loser observes a successful
//! update, never a duplicate-key error.

use crate::{
    alert::{AlertRecord, AlertSink, LogAlertSink},
    config::LedgerConfig,
    error::{LedgerError, Result},
    storage::Storage,
    types::{AttemptFilter, AttemptStatus, PaymentAttempt, RecordUpdate, Scope},
};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info};

/// Default row cap for filter queries
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Durable payment-attempt ledger
pub struct Ledger {
    storage: Storage,
    alert_sink: Arc<dyn AlertSink>,
    // Serializes read-modify-write upserts; reads go lock-free.
    write_lock: Mutex<()>,
}

impl Ledger {
    /// Open the ledger with the default log-based alert sink
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        Self::with_alert_sink(config, Arc::new(LogAlertSink))
    }

    /// Open the ledger with a custom alert sink
    pub fn with_alert_sink(config: &LedgerConfig, alert_sink: Arc<dyn AlertSink>) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(config)?,
            alert_sink,
            write_lock: Mutex::new(()),
        })
    }

    /// Record a payment attempt outcome (idempotent upsert).
    ///
    /// Insert: creates the record with the given status and fields
    /// (`amount_cents` and `user_id` required). Update: validates the
    /// status transition, merges only the provided fields and refreshes
    /// `updated_at`; `amount_cents` and `created_at` stay untouched.
    ///
    /// The record write and its index maintenance commit atomically. Any
    /// write that lands the attempt in `UNKNOWN` raises a best-effort alert
    /// after the commit; alert failures never fail the write.
    pub fn record(
        &self,
        transaction_id: &str,
        status: AttemptStatus,
        update: RecordUpdate,
    ) -> Result<PaymentAttempt> {
        if transaction_id.is_empty() {
            return Err(LedgerError::InvalidRecord(
                "transaction_id must not be empty".into(),
            ));
        }

        let _guard = self.write_lock.lock();

        let previous = self.storage.get_attempt(transaction_id)?;
        let now = Utc::now();

        let (attempt, alert_worthy) = match previous {
            None => {
                let amount_cents = update.amount_cents.ok_or_else(|| {
                    LedgerError::InvalidRecord("amount_cents is required on insert".into())
                })?;
                let user_id = update.user_id.clone().ok_or_else(|| {
                    LedgerError::InvalidRecord("user_id is required on insert".into())
                })?;

                let attempt = PaymentAttempt {
                    transaction_id: transaction_id.to_string(),
                    status,
                    amount_cents,
                    auth_code: update.auth_code,
                    card_last4: update.card_last4,
                    card_brand: update.card_brand,
                    terminal_id: update.terminal_id,
                    reason: update.reason,
                    station_id: update.station_id,
                    location_id: update.location_id,
                    user_id,
                    created_at: now,
                    updated_at: now,
                };
                self.storage.put_attempt_indexed(&attempt, None)?;
                (attempt, status.needs_reconciliation())
            }
            Some(prev) => {
                if !prev.status.can_transition_to(status) {
                    return Err(LedgerError::InvalidTransition {
                        transaction_id: transaction_id.to_string(),
                        from: prev.status,
                        to: status,
                    });
                }

                let mut next = prev.clone();
                next.status = status;
                next.updated_at = now;
                merge(&mut next, update);

                self.storage.put_attempt_indexed(&next, Some(&prev))?;
                let alert_worthy =
                    status.needs_reconciliation() && !prev.status.needs_reconciliation();
                (next, alert_worthy)
            }
        };

        info!(
            transaction_id = %attempt.transaction_id,
            status = %attempt.status,
            amount_cents = attempt.amount_cents,
            "payment attempt recorded"
        );

        if alert_worthy {
            self.raise_alert(&attempt);
        }

        Ok(attempt)
    }

    /// Get an attempt by transaction id
    pub fn get(&self, transaction_id: &str) -> Result<Option<PaymentAttempt>> {
        self.storage.get_attempt(transaction_id)
    }

    /// Attempts matching the filter, visible to the scope, newest first.
    ///
    /// Status-filtered queries walk the status index (the `UNKNOWN`/`ERROR`
    /// triage pattern), never a full scan.
    pub fn list_by_filter(
        &self,
        filter: &AttemptFilter,
        scope: &Scope,
    ) -> Result<Vec<PaymentAttempt>> {
        let limit = filter.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

        if let Some(transaction_id) = &filter.transaction_id {
            return Ok(self
                .storage
                .get_attempt(transaction_id)?
                .filter(|a| filter.status.map_or(true, |s| a.status == s))
                .filter(|a| scope.permits(a))
                .into_iter()
                .take(limit)
                .collect());
        }

        let ids = match filter.status {
            Some(status) => self.storage.status_index(status)?,
            None => self.storage.recency_index()?,
        };

        let mut attempts = Vec::new();
        for id in ids {
            if attempts.len() == limit {
                break;
            }
            if let Some(attempt) = self.storage.get_attempt(&id)? {
                if scope.permits(&attempt) {
                    attempts.push(attempt);
                }
            }
        }
        Ok(attempts)
    }

    /// Alert rows referencing one transaction
    pub fn alerts_for(&self, transaction_id: &str) -> Result<Vec<AlertRecord>> {
        self.storage.alerts_for(transaction_id)
    }

    /// All alert rows (reconciliation queue)
    pub fn list_alerts(&self) -> Result<Vec<AlertRecord>> {
        self.storage.list_alerts()
    }

    // Best-effort: the primary write already committed.
    fn raise_alert(&self, attempt: &PaymentAttempt) {
        let alert = AlertRecord::unresolved(&attempt.transaction_id, attempt.reason.as_deref());
        if let Err(err) = self.storage.put_alert(&alert) {
            error!(
                transaction_id = %attempt.transaction_id,
                %err,
                "failed to persist reconciliation alert"
            );
        }
        if let Err(err) = self.alert_sink.raise(&alert) {
            error!(
                transaction_id = %attempt.transaction_id,
                %err,
                "failed to deliver reconciliation alert"
            );
        }
    }
}

fn merge(attempt: &mut PaymentAttempt, update: RecordUpdate) {
    // amount_cents, user_id and created_at are fixed at insert.
    if let Some(auth_code) = update.auth_code {
        attempt.auth_code = Some(auth_code);
    }
    if let Some(card_last4) = update.card_last4 {
        attempt.card_last4 = Some(card_last4);
    }
    if let Some(card_brand) = update.card_brand {
        attempt.card_brand = Some(card_brand);
    }
    if let Some(terminal_id) = update.terminal_id {
        attempt.terminal_id = Some(terminal_id);
    }
    if let Some(reason) = update.reason {
        attempt.reason = Some(reason);
    }
    if let Some(station_id) = update.station_id {
        attempt.station_id = Some(station_id);
    }
    if let Some(location_id) = update.location_id {
        attempt.location_id = Some(location_id);
    }
}
