//! Integration tests for the dispatch path
//!
//! The critical property: a transport or integrity failure never yields
//! `APPROVED` or `DECLINED` from the bridge side — only `UNKNOWN`, or
//! whatever the terminal itself actually returned.

use async_trait::async_trait;
use payment_ledger::{AttemptStatus, Ledger, LedgerConfig};
use pos_gateway::config::TerminalConfig;
use pos_gateway::context::{CallerContext, CallerRole};
use pos_gateway::dispatch::{DispatchRateLimiter, PaymentDispatcher};
use pos_gateway::errors::GatewayError;
use pos_gateway::models::SubmitPaymentRequest;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use terminal_bridge::{TerminalBridge, TerminalLink, TransportError};
use terminal_protocol::{ResponseFrame, APPROVED_RESPONSE_CODE};

/// Link that returns a canned outcome without touching the network
struct MockLink {
    outcome: Result<Vec<u8>, TransportError>,
}

#[async_trait]
impl TerminalLink for MockLink {
    async fn exchange(
        &self,
        _addr: &str,
        _payload: &[u8],
        _timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.outcome.clone()
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn terminal_config() -> TerminalConfig {
    TerminalConfig {
        host: "127.0.0.1".to_string(),
        port: 10009,
        terminal_id: "term-9".to_string(),
        timeout_secs: 1,
    }
}

fn caller() -> CallerContext {
    CallerContext {
        user_id: Some("u-1".to_string()),
        role: CallerRole::Station,
        station_id: Some("st-1".to_string()),
        location_id: Some("loc-1".to_string()),
    }
}

fn sale(transaction_id: &str) -> SubmitPaymentRequest {
    SubmitPaymentRequest {
        transaction_id: Some(transaction_id.to_string()),
        amount_cents: Some(1348),
        invoice_number: Some("INV-1001".to_string()),
        reference_number: None,
    }
}

fn harness(outcome: Result<Vec<u8>, TransportError>) -> (PaymentDispatcher, Arc<Ledger>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let ledger = Arc::new(Ledger::open(&LedgerConfig::at(temp_dir.path())).unwrap());
    let bridge = TerminalBridge::new(Arc::new(MockLink { outcome }));
    let dispatcher = PaymentDispatcher::new(bridge, ledger.clone(), terminal_config(), None);
    (dispatcher, ledger, temp_dir)
}

fn approved_payload() -> Vec<u8> {
    let mut response = ResponseFrame::sale(APPROVED_RESPONSE_CODE, "APPROVED");
    response.host.0[2] = "AB12".to_string();
    response.host.0[3] = "000042".to_string();
    response.account.0[0] = "400012******4242".to_string();
    response.account.0[6] = "VISA".to_string();
    response.encode().unwrap()
}

#[actix_web::test]
async fn test_approved_authorization() {
    let (dispatcher, ledger, _temp) = harness(Ok(approved_payload()));

    let attempt = dispatcher.submit_payment(&caller(), sale("tx-ok")).await.unwrap();

    assert_eq!(attempt.status, AttemptStatus::Approved);
    assert_eq!(attempt.amount_cents, 1348);
    assert_eq!(attempt.auth_code.as_deref(), Some("AB12"));
    assert_eq!(attempt.card_last4.as_deref(), Some("4242"));
    assert_eq!(attempt.card_brand.as_deref(), Some("VISA"));
    assert_eq!(attempt.terminal_id.as_deref(), Some("term-9"));
    assert_eq!(attempt.station_id.as_deref(), Some("st-1"));

    let stored = ledger.get("tx-ok").unwrap().unwrap();
    assert_eq!(stored.status, AttemptStatus::Approved);
    assert!(ledger.alerts_for("tx-ok").unwrap().is_empty());
}

#[actix_web::test]
async fn test_declined_authorization() {
    let declined = ResponseFrame::sale("100001", "DECLINE").encode().unwrap();
    let (dispatcher, ledger, _temp) = harness(Ok(declined));

    let attempt = dispatcher.submit_payment(&caller(), sale("tx-no")).await.unwrap();

    assert_eq!(attempt.status, AttemptStatus::Declined);
    assert_eq!(attempt.reason.as_deref(), Some("DECLINE"));
    assert!(ledger.alerts_for("tx-no").unwrap().is_empty());
}

#[actix_web::test]
async fn test_timeout_is_unknown_never_declined() {
    let (dispatcher, ledger, _temp) = harness(Err(TransportError::Timeout));

    let attempt = dispatcher.submit_payment(&caller(), sale("tx-t")).await.unwrap();

    assert_eq!(attempt.status, AttemptStatus::Unknown);
    assert_eq!(attempt.reason.as_deref(), Some("TRANSPORT_TIMEOUT"));
    // The ambiguous outcome is flagged for out-of-band reconciliation.
    assert_eq!(ledger.alerts_for("tx-t").unwrap().len(), 1);
}

#[actix_web::test]
async fn test_connection_reset_is_unknown() {
    let (dispatcher, _ledger, _temp) = harness(Err(TransportError::ConnectionReset));

    let attempt = dispatcher.submit_payment(&caller(), sale("tx-r")).await.unwrap();

    assert_eq!(attempt.status, AttemptStatus::Unknown);
    assert_eq!(attempt.reason.as_deref(), Some("CONNECTION_RESET"));
}

#[actix_web::test]
async fn test_transport_error_is_unknown() {
    let (dispatcher, _ledger, _temp) =
        harness(Err(TransportError::Transport("refused".to_string())));

    let attempt = dispatcher.submit_payment(&caller(), sale("tx-e")).await.unwrap();

    assert_eq!(attempt.status, AttemptStatus::Unknown);
    assert_eq!(attempt.reason.as_deref(), Some("TRANSPORT_ERROR"));
}

#[actix_web::test]
async fn test_corrupt_response_is_unknown() {
    // A "response" that fails the integrity check outright.
    let (dispatcher, ledger, _temp) = harness(Ok(b"garbage-not-a-frame".to_vec()));

    let attempt = dispatcher.submit_payment(&caller(), sale("tx-c")).await.unwrap();

    assert_eq!(attempt.status, AttemptStatus::Unknown);
    assert_eq!(attempt.reason.as_deref(), Some("DECODE_CHECKSUM_MISMATCH"));
    assert_eq!(ledger.alerts_for("tx-c").unwrap().len(), 1);
}

#[actix_web::test]
async fn test_unexpected_response_shape_is_error() {
    // Integrity-valid frame that matches no response schema: a request
    // frame echoed back.
    let echoed = terminal_protocol::CommandFrame::sale(&terminal_protocol::SaleRequest {
        amount_cents: 1348,
        invoice_number: "INV-1001".to_string(),
        reference_number: None,
    })
    .unwrap()
    .encode()
    .unwrap();
    let (dispatcher, ledger, _temp) = harness(Ok(echoed));

    let attempt = dispatcher.submit_payment(&caller(), sale("tx-s")).await.unwrap();

    assert_eq!(attempt.status, AttemptStatus::Error);
    assert!(attempt
        .reason
        .as_deref()
        .unwrap()
        .starts_with("DECODE_SCHEMA_MISMATCH"));
    // Shape errors are not ambiguous; no reconciliation alert.
    assert!(ledger.alerts_for("tx-s").unwrap().is_empty());
}

#[actix_web::test]
async fn test_encode_failure_leaves_no_ledger_record() {
    let (dispatcher, ledger, _temp) = harness(Ok(approved_payload()));

    let mut request = sale("tx-bad");
    request.amount_cents = Some(-5);
    let err = dispatcher.submit_payment(&caller(), request).await.unwrap_err();

    assert!(matches!(err, GatewayError::InvalidField(_)));
    // Fix-and-resend: no attempt exists until a dispatch attempt exists.
    assert!(ledger.get("tx-bad").unwrap().is_none());
}

#[actix_web::test]
async fn test_missing_user_is_rejected() {
    let (dispatcher, _ledger, _temp) = harness(Ok(approved_payload()));

    let mut ctx = caller();
    ctx.user_id = None;
    let err = dispatcher.submit_payment(&ctx, sale("tx-u")).await.unwrap_err();
    assert!(matches!(err, GatewayError::MissingField(_)));
}

#[actix_web::test]
async fn test_injected_rate_limiter_caps_dispatches() {
    let temp_dir = TempDir::new().unwrap();
    let ledger = Arc::new(Ledger::open(&LedgerConfig::at(temp_dir.path())).unwrap());
    let bridge = TerminalBridge::new(Arc::new(MockLink {
        outcome: Ok(approved_payload()),
    }));
    let dispatcher = PaymentDispatcher::new(
        bridge,
        ledger,
        terminal_config(),
        DispatchRateLimiter::per_minute(1),
    );

    dispatcher.submit_payment(&caller(), sale("tx-1")).await.unwrap();
    let err = dispatcher
        .submit_payment(&caller(), sale("tx-2"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::RateLimited));
}

#[actix_web::test]
async fn test_ledger_gates_blind_redispatch_of_unknown() {
    // First dispatch times out. A blind re-dispatch under the same
    // transaction id is rejected by the state machine: the attempt must be
    // reconciled (closed out as APPROVED or DECLINED) before anything else
    // happens to it, because the terminal may already have charged the card.
    let temp_dir = TempDir::new().unwrap();
    let ledger = Arc::new(Ledger::open(&LedgerConfig::at(temp_dir.path())).unwrap());

    let timeout_bridge = TerminalBridge::new(Arc::new(MockLink {
        outcome: Err(TransportError::Timeout),
    }));
    let first = PaymentDispatcher::new(timeout_bridge, ledger.clone(), terminal_config(), None);
    let attempt = first.submit_payment(&caller(), sale("tx-rt")).await.unwrap();
    assert_eq!(attempt.status, AttemptStatus::Unknown);

    let ok_bridge = TerminalBridge::new(Arc::new(MockLink {
        outcome: Ok(approved_payload()),
    }));
    let second = PaymentDispatcher::new(ok_bridge, ledger.clone(), terminal_config(), None);
    let err = second
        .submit_payment(&caller(), sale("tx-rt"))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_TRANSITION");

    // The stored record still says UNKNOWN; nothing was double-charged.
    let stored = ledger.get("tx-rt").unwrap().unwrap();
    assert_eq!(stored.status, AttemptStatus::Unknown);
}
