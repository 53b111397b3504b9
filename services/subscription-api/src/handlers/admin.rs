//! Catalog and platform settings handlers
//!
//! Plans may be created by their vendor or by an admin; everything else here
//! is admin only. Role checks live in the catalog, not the route.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use tiffin_lifecycle::{NewPlan, NewTrialType, PlanUpdate, TrialTypeUpdate};
use tiffin_types::{Plan, PlanId, PlatformSettings, TrialType, TrialTypeId};

use super::shared::observe;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

// ============================================================================
// Platform Settings
// ============================================================================

/// GET /api/v1/admin/settings
pub async fn get_settings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<PlatformSettings>> {
    let start = Instant::now();
    let result = state.catalog.settings(&auth).await.map_err(Into::into);
    observe("get_settings", start, result).map(Json)
}

/// PUT /api/v1/admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(settings): Json<PlatformSettings>,
) -> ApiResult<Json<PlatformSettings>> {
    let start = Instant::now();
    let result = state
        .catalog
        .update_settings(&auth, settings)
        .await
        .map_err(Into::into);
    let settings = observe("update_settings", start, result)?;

    tracing::info!(user_id = %auth.user_id, "Platform settings updated");
    Ok(Json(settings))
}

// ============================================================================
// Plans
// ============================================================================

/// POST /api/v1/admin/plans
pub async fn create_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(plan): Json<NewPlan>,
) -> ApiResult<(StatusCode, Json<Plan>)> {
    let start = Instant::now();
    let result = state
        .catalog
        .create_plan(&auth, plan, Utc::now())
        .await
        .map_err(Into::into);
    observe("create_plan", start, result).map(|plan| (StatusCode::CREATED, Json(plan)))
}

/// PUT /api/v1/admin/plans/{id}
pub async fn update_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<PlanId>,
    Json(update): Json<PlanUpdate>,
) -> ApiResult<Json<Plan>> {
    let start = Instant::now();
    let result = state
        .catalog
        .update_plan(&auth, id, update)
        .await
        .map_err(Into::into);
    observe("update_plan", start, result).map(Json)
}

/// POST /api/v1/admin/plans/{id}/deactivate
pub async fn deactivate_plan(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<PlanId>,
) -> ApiResult<Json<Plan>> {
    let start = Instant::now();
    let result = state
        .catalog
        .deactivate_plan(&auth, id)
        .await
        .map_err(Into::into);
    observe("deactivate_plan", start, result).map(Json)
}

// ============================================================================
// Trial Types
// ============================================================================

/// POST /api/v1/admin/trial-types
pub async fn create_trial_type(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(trial): Json<NewTrialType>,
) -> ApiResult<(StatusCode, Json<TrialType>)> {
    let start = Instant::now();
    let result = state
        .catalog
        .create_trial_type(&auth, trial, Utc::now())
        .await
        .map_err(Into::into);
    observe("create_trial_type", start, result).map(|trial| (StatusCode::CREATED, Json(trial)))
}

/// PUT /api/v1/admin/trial-types/{id}
pub async fn update_trial_type(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<TrialTypeId>,
    Json(update): Json<TrialTypeUpdate>,
) -> ApiResult<Json<TrialType>> {
    let start = Instant::now();
    let result = state
        .catalog
        .update_trial_type(&auth, id, update)
        .await
        .map_err(Into::into);
    observe("update_trial_type", start, result).map(Json)
}
