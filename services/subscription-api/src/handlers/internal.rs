//! Scheduler-facing handlers
//!
//! Renewal, expiry and the periodic sweeps. These carry no user identity;
//! callers present the internal token instead.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use tiffin_lifecycle::{RenewalOutcome, RenewalPayment, RenewalQuote, SweepReport};
use tiffin_types::{Subscription, SubscriptionId};

use super::shared::observe;
use crate::error::ApiResult;
use crate::extractors::InternalCaller;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    pub payment_id: String,
    /// Captured amount in paise
    pub amount: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenewBody {
    /// Captured payment; absent when credit covers the whole cycle
    #[serde(default)]
    pub payment: Option<PaymentBody>,
}

#[derive(Debug, Serialize)]
pub struct ExpiredCredits {
    pub expired: u64,
}

/// POST /internal/renewals/{id}/quote
pub async fn quote_renewal(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Path(id): Path<SubscriptionId>,
) -> ApiResult<Json<RenewalQuote>> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .quote_renewal(id, Utc::now())
        .await
        .map_err(Into::into);
    observe("quote_renewal", start, result).map(Json)
}

/// POST /internal/renewals/{id}
pub async fn renew(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Path(id): Path<SubscriptionId>,
    body: Option<Json<RenewBody>>,
) -> ApiResult<Json<RenewalOutcome>> {
    let start = Instant::now();
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let payment = body.payment.map(|p| RenewalPayment {
        payment_id: p.payment_id,
        amount: p.amount,
    });

    let result = state
        .lifecycle
        .renew(id, payment, Utc::now())
        .await
        .map_err(Into::into);
    let outcome = observe("renew", start, result)?;

    tracing::info!(
        subscription_id = %id,
        renewal_date = %outcome.subscription.renewal_date,
        orders = outcome.orders_created,
        "Subscription renewed"
    );
    Ok(Json(outcome))
}

/// POST /internal/subscriptions/{id}/expire
pub async fn expire(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Path(id): Path<SubscriptionId>,
) -> ApiResult<Json<Subscription>> {
    let start = Instant::now();
    let result = state.lifecycle.expire(id).await.map_err(Into::into);
    observe("expire", start, result).map(Json)
}

/// POST /internal/pauses/sweep
///
/// End bounded pauses that are over, then force-cancel subscriptions paused
/// past the platform limit.
pub async fn sweep_pauses(
    State(state): State<AppState>,
    _caller: InternalCaller,
) -> ApiResult<Json<SweepReport>> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .sweep_overlong_pauses(Utc::now())
        .await
        .map_err(Into::into);
    let report = observe("sweep_pauses", start, result)?;

    tracing::info!(
        resumed = report.resumed.len(),
        cancelled = report.cancelled.len(),
        "Pause sweep finished"
    );
    if !report.failed.is_empty() {
        tracing::warn!(failed = report.failed.len(), "Pause sweep left subscriptions behind");
    }
    Ok(Json(report))
}

/// POST /internal/credits/expire
pub async fn expire_credits(
    State(state): State<AppState>,
    _caller: InternalCaller,
) -> ApiResult<Json<ExpiredCredits>> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .ledger()
        .expire_due(Utc::now())
        .await
        .map_err(Into::into);
    let expired = observe("expire_credits", start, result)?;

    tracing::info!(expired, "Expired due credits");
    Ok(Json(ExpiredCredits { expired }))
}
