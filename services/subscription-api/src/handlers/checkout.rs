//! Checkout and trial handlers

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use tiffin_lifecycle::{Checkout, CheckoutRequest, SubscriptionView, TrialRequest};

use super::shared::observe;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/v1/checkout
///
/// Price a plan or trial and open the gateway order the client pays against.
pub async fn create_checkout(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<Json<Checkout>> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .checkout(&auth, req, Utc::now())
        .await
        .map_err(Into::into);
    let checkout = observe("checkout", start, result)?;

    tracing::info!(
        gateway_order_id = %checkout.gateway_order.id,
        price = checkout.price,
        "Checkout created"
    );
    Ok(Json(checkout))
}

/// POST /api/v1/trials
pub async fn start_trial(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<TrialRequest>,
) -> ApiResult<(StatusCode, Json<SubscriptionView>)> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .start_trial(&auth, req, Utc::now())
        .await
        .map_err(Into::into);
    observe("start_trial", start, result).map(|view| (StatusCode::CREATED, Json(view)))
}
