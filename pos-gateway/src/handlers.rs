//! HTTP handlers

use crate::context::CallerContext;
use crate::dispatch::PaymentDispatcher;
use crate::errors::GatewayError;
use crate::models::{LogPaymentRequest, LogQuery, SubmitPaymentRequest};
use actix_web::{web, HttpResponse};
use payment_ledger::{AttemptFilter, AttemptStatus, Ledger, RecordUpdate};
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "pos-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `POST /payments/log`
///
/// Post-hoc confirmation/fallback write path, decoupled from live dispatch.
/// Missing `transactionId` or `status` is a 400; anything else that fails
/// is a 500 with a stable error code. A write with status `UNKNOWN` also
/// creates an alert record.
pub async fn log_payment(
    ledger: web::Data<Arc<Ledger>>,
    ctx: CallerContext,
    body: web::Json<LogPaymentRequest>,
) -> Result<HttpResponse, GatewayError> {
    let user_id = ctx.require_user()?.to_string();
    let body = body.into_inner();

    let transaction_id = body
        .transaction_id
        .filter(|t| !t.is_empty())
        .ok_or(GatewayError::MissingField("transactionId"))?;
    let status_text = body
        .status
        .filter(|s| !s.is_empty())
        .ok_or(GatewayError::MissingField("status"))?;
    let status = AttemptStatus::parse(&status_text)
        .ok_or_else(|| GatewayError::InvalidField(format!("status {status_text:?}")))?;

    let update = RecordUpdate {
        amount_cents: body.amount,
        auth_code: body.auth_code,
        card_last4: body.card_last4,
        card_brand: body.card_brand,
        terminal_id: body.terminal_id,
        reason: body.reason,
        station_id: body.station_id.or(ctx.station_id),
        location_id: body.location_id.or(ctx.location_id),
        user_id: Some(user_id),
    };

    let ledger = ledger.get_ref().clone();
    let attempt = web::block(move || ledger.record(&transaction_id, status, update))
        .await
        .map_err(|e| GatewayError::Internal(format!("blocking pool: {e}")))??;

    Ok(HttpResponse::Ok().json(attempt))
}

/// `GET /payments/log`
///
/// Scoped to the caller's authorization boundary, newest first.
pub async fn query_payments(
    ledger: web::Data<Arc<Ledger>>,
    ctx: CallerContext,
    query: web::Query<LogQuery>,
) -> Result<HttpResponse, GatewayError> {
    let scope = ctx.scope()?;
    let query = query.into_inner();

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(text) => Some(
            AttemptStatus::parse(text)
                .ok_or_else(|| GatewayError::InvalidField(format!("status {text:?}")))?,
        ),
        None => None,
    };

    let filter = AttemptFilter {
        status,
        transaction_id: query.transaction_id.filter(|t| !t.is_empty()),
        limit: query.limit,
    };

    let ledger = ledger.get_ref().clone();
    let payments = web::block(move || ledger.list_by_filter(&filter, &scope))
        .await
        .map_err(|e| GatewayError::Internal(format!("blocking pool: {e}")))??;

    Ok(HttpResponse::Ok().json(json!({
        "count": payments.len(),
        "payments": payments
    })))
}

/// `POST /payments/submit`
///
/// Drives encode → transport → decode → record and returns the resulting
/// attempt (status included) synchronously.
pub async fn submit_payment(
    dispatcher: web::Data<Arc<PaymentDispatcher>>,
    ctx: CallerContext,
    body: web::Json<SubmitPaymentRequest>,
) -> Result<HttpResponse, GatewayError> {
    let attempt = dispatcher.submit_payment(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(attempt))
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/log", web::post().to(log_payment))
            .route("/log", web::get().to(query_payments))
            .route("/submit", web::post().to(submit_payment)),
    )
    .route("/health", web::get().to(health_check));
}
