//! Subscription lifecycle handlers

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use tiffin_lifecycle::{
    CancelOutcome, ConvertRequest, PauseOutcome, ResumeOutcome, SkipOutcome, SubscribeRequest,
    SubscriptionView,
};
use tiffin_types::{RefundChoice, Slot, SubscriptionId};

use super::shared::observe;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct PauseBody {
    /// Last paused day; open-ended when absent
    #[serde(default)]
    pub until: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResumeBody {
    /// First delivery day after the pause; the earliest allowed when absent
    #[serde(default)]
    pub resume_on: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBody {
    #[serde(default)]
    pub reason: Option<String>,
    /// Required when the platform lets the customer choose
    #[serde(default)]
    pub refund_choice: Option<RefundChoice>,
}

#[derive(Debug, Deserialize)]
pub struct SkipBody {
    pub service_date: NaiveDate,
    pub slot: Slot,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/subscriptions/{id}
pub async fn get_subscription(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SubscriptionId>,
) -> ApiResult<Json<SubscriptionView>> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .get(&auth, id, Utc::now())
        .await
        .map_err(Into::into);
    observe("get_subscription", start, result).map(Json)
}

/// POST /api/v1/subscriptions
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<SubscriptionView>)> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .subscribe(&auth, req, Utc::now())
        .await
        .map_err(Into::into);
    let view = observe("subscribe", start, result)?;

    tracing::info!(subscription_id = %view.subscription.id, "Subscription created");
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/v1/subscriptions/{id}/pause
pub async fn pause(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SubscriptionId>,
    body: Option<Json<PauseBody>>,
) -> ApiResult<Json<PauseOutcome>> {
    let start = Instant::now();
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let result = state
        .lifecycle
        .pause(&auth, id, body.until, Utc::now())
        .await
        .map_err(Into::into);
    observe("pause", start, result).map(Json)
}

/// POST /api/v1/subscriptions/{id}/resume
pub async fn resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SubscriptionId>,
    body: Option<Json<ResumeBody>>,
) -> ApiResult<Json<ResumeOutcome>> {
    let start = Instant::now();
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let result = state
        .lifecycle
        .resume(&auth, id, body.resume_on, Utc::now())
        .await
        .map_err(Into::into);
    let outcome = observe("resume", start, result)?;

    if let Some(credit) = &outcome.credit {
        tracing::debug!(credit_id = %credit.id, amount = credit.amount, "Pause credit issued");
    }
    Ok(Json(outcome))
}

/// POST /api/v1/subscriptions/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SubscriptionId>,
    body: Option<Json<CancelBody>>,
) -> ApiResult<Json<CancelOutcome>> {
    let start = Instant::now();
    let body = body.map(|Json(body)| body).unwrap_or_default();
    let result = state
        .lifecycle
        .cancel(&auth, id, body.reason, body.refund_choice, Utc::now())
        .await
        .map_err(Into::into);
    observe("cancel", start, result).map(Json)
}

/// POST /api/v1/subscriptions/{id}/skip
pub async fn skip(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SubscriptionId>,
    Json(body): Json<SkipBody>,
) -> ApiResult<Json<SkipOutcome>> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .apply_skip(&auth, id, body.service_date, body.slot, Utc::now())
        .await
        .map_err(Into::into);
    observe("skip", start, result).map(Json)
}

/// POST /api/v1/subscriptions/{id}/convert
pub async fn convert_trial(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<SubscriptionId>,
    Json(req): Json<ConvertRequest>,
) -> ApiResult<Json<SubscriptionView>> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .convert_trial(&auth, id, req, Utc::now())
        .await
        .map_err(Into::into);
    observe("convert_trial", start, result).map(Json)
}
