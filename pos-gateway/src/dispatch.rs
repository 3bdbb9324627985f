//! Payment dispatch path
//!
//! Drives one payment attempt end to end: encode → transport → decode →
//! record. The ledger write after the exchange is what distinguishes "card
//! declined" from "communication lost, outcome unknown" — a transport or
//! integrity failure is only ever recorded as `UNKNOWN`, because the
//! terminal may have completed the authorization on its side.

use crate::config::TerminalConfig;
use crate::context::CallerContext;
use crate::errors::{GatewayError, Result};
use crate::models::SubmitPaymentRequest;
use actix_web::web;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use payment_ledger::{AttemptStatus, Ledger, PaymentAttempt, RecordUpdate};
use std::num::NonZeroU32;
use std::sync::Arc;
use terminal_bridge::TerminalBridge;
use terminal_protocol::{CommandFrame, ProtocolError, ResponseFrame, SaleRequest};
use tracing::{info, warn};

/// Injected token-bucket limiter for the dispatch path
///
/// Explicitly constructed at wiring time and handed to the dispatcher, so
/// the bridge and ledger stay independently testable with no ambient state.
pub struct DispatchRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl DispatchRateLimiter {
    /// Limiter allowing `rate` dispatches per minute; `None` if `rate` is 0
    pub fn per_minute(rate: u32) -> Option<Self> {
        NonZeroU32::new(rate).map(|rate| Self {
            limiter: RateLimiter::direct(Quota::per_minute(rate)),
        })
    }

    /// Whether another dispatch may proceed now
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

/// Orchestrates submit-payment calls
pub struct PaymentDispatcher {
    bridge: TerminalBridge,
    ledger: Arc<Ledger>,
    terminal: TerminalConfig,
    limiter: Option<DispatchRateLimiter>,
}

impl PaymentDispatcher {
    pub fn new(
        bridge: TerminalBridge,
        ledger: Arc<Ledger>,
        terminal: TerminalConfig,
        limiter: Option<DispatchRateLimiter>,
    ) -> Self {
        Self {
            bridge,
            ledger,
            terminal,
            limiter,
        }
    }

    /// Submit a payment to the terminal and record the outcome.
    ///
    /// Returns the resulting ledger attempt synchronously. Encode failures
    /// return before any ledger write so a fixed request can be resent
    /// under the same transaction id.
    pub async fn submit_payment(
        &self,
        ctx: &CallerContext,
        request: SubmitPaymentRequest,
    ) -> Result<PaymentAttempt> {
        let user_id = ctx.require_user()?.to_string();

        if let Some(limiter) = &self.limiter {
            if !limiter.check() {
                return Err(GatewayError::RateLimited);
            }
        }

        let transaction_id = request
            .transaction_id
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::MissingField("transactionId"))?;
        let amount_cents = request
            .amount_cents
            .ok_or(GatewayError::MissingField("amountCents"))?;
        if amount_cents <= 0 {
            return Err(GatewayError::InvalidField(format!(
                "amountCents must be positive, got {amount_cents}"
            )));
        }
        let invoice_number = request
            .invoice_number
            .filter(|i| !i.is_empty())
            .ok_or(GatewayError::MissingField("invoiceNumber"))?;

        let sale = SaleRequest {
            amount_cents,
            invoice_number,
            reference_number: request.reference_number,
        };
        let payload = CommandFrame::sale(&sale)?.encode()?;

        // The dispatch attempt exists from here on; every path below must
        // leave the ledger with the attempt's true outcome.
        self.record(
            &transaction_id,
            AttemptStatus::Sent,
            RecordUpdate {
                amount_cents: Some(amount_cents),
                user_id: Some(user_id),
                terminal_id: Some(self.terminal.terminal_id.clone()),
                station_id: ctx.station_id.clone(),
                location_id: ctx.location_id.clone(),
                ..RecordUpdate::default()
            },
        )
        .await?;

        let response = match self
            .bridge
            .dispatch(&self.terminal.addr(), &payload, self.terminal.timeout())
            .await
        {
            Ok(response) => response,
            Err(transport) => {
                // The terminal may have authorized even though no response
                // arrived; never a decline.
                warn!(
                    transaction_id = %transaction_id,
                    code = transport.code(),
                    "transport failure, outcome unknown"
                );
                return self
                    .record(
                        &transaction_id,
                        AttemptStatus::Unknown,
                        RecordUpdate {
                            reason: Some(transport.code().to_string()),
                            ..RecordUpdate::default()
                        },
                    )
                    .await;
            }
        };

        match ResponseFrame::decode(&response) {
            Ok(frame) if frame.approved() => {
                info!(transaction_id = %transaction_id, "authorization approved");
                self.record(
                    &transaction_id,
                    AttemptStatus::Approved,
                    RecordUpdate {
                        auth_code: frame.auth_code().map(str::to_string),
                        card_last4: frame.card_last4(),
                        card_brand: frame.card_brand().map(str::to_string),
                        ..RecordUpdate::default()
                    },
                )
                .await
            }
            Ok(frame) => {
                let reason = if frame.response_message.is_empty() {
                    frame.response_code.clone()
                } else {
                    frame.response_message.clone()
                };
                info!(transaction_id = %transaction_id, reason = %reason, "authorization declined");
                self.record(
                    &transaction_id,
                    AttemptStatus::Declined,
                    RecordUpdate {
                        reason: Some(reason),
                        ..RecordUpdate::default()
                    },
                )
                .await
            }
            Err(err @ ProtocolError::ChecksumMismatch(_)) => {
                // A response arrived but cannot be trusted; the outcome is
                // as ambiguous as a lost connection.
                warn!(transaction_id = %transaction_id, %err, "response failed integrity check");
                self.record(
                    &transaction_id,
                    AttemptStatus::Unknown,
                    RecordUpdate {
                        reason: Some(err.code().to_string()),
                        ..RecordUpdate::default()
                    },
                )
                .await
            }
            Err(err) => {
                warn!(transaction_id = %transaction_id, %err, "unexpected response shape");
                self.record(
                    &transaction_id,
                    AttemptStatus::Error,
                    RecordUpdate {
                        reason: Some(format!("{}: {err}", err.code())),
                        ..RecordUpdate::default()
                    },
                )
                .await
            }
        }
    }

    async fn record(
        &self,
        transaction_id: &str,
        status: AttemptStatus,
        update: RecordUpdate,
    ) -> Result<PaymentAttempt> {
        let ledger = self.ledger.clone();
        let transaction_id = transaction_id.to_string();
        web::block(move || ledger.record(&transaction_id, status, update))
            .await
            .map_err(|e| GatewayError::Internal(format!("blocking pool: {e}")))?
            .map_err(GatewayError::from)
    }
}
