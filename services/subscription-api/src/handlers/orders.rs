//! Order outcome handler

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use tiffin_lifecycle::MarkOutcome;
use tiffin_types::{OrderId, OrderOutcome};

use super::shared::observe;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OutcomeBody {
    pub outcome: OrderOutcome,
}

/// POST /api/v1/orders/{id}/outcome
///
/// Vendors record preparation results and vendor skips; riders record
/// deliveries.
pub async fn mark_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<OrderId>,
    Json(body): Json<OutcomeBody>,
) -> ApiResult<Json<MarkOutcome>> {
    let start = Instant::now();
    let result = state
        .lifecycle
        .mark_order(&auth, id, body.outcome, Utc::now())
        .await
        .map_err(Into::into);
    observe("mark_order", start, result).map(Json)
}
