//! Credit ledger handlers

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use tiffin_types::Credit;

use super::shared::observe;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    /// Sum of unexpired, unredeemed credit in paise
    pub balance: i64,
    /// Full history, newest first
    pub credits: Vec<Credit>,
}

/// GET /api/v1/credits
pub async fn list_credits(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<CreditsResponse>> {
    let start = Instant::now();
    let ledger = state.lifecycle.ledger();

    let result: ApiResult<CreditsResponse> = async {
        let balance = ledger.balance(auth.user_id, Utc::now()).await?;
        let credits = ledger.list(auth.user_id).await?;
        Ok(CreditsResponse { balance, credits })
    }
    .await;

    observe("list_credits", start, result).map(Json)
}
