//! On-demand sweep and encounter history for the caller's bird.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use flyway_agents::encounter_history;
use flyway_storage::RecordStore;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::extractors::Caller;
use crate::routes::caller_bird;
use crate::state::AppState;
use crate::types::{EncounterCheckResponse, EncounterHistoryResponse};

/// POST /api/encounters/check - Sweep the caller's bird against everyone else
#[utoipa::path(
    post,
    path = "/api/encounters/check",
    tag = "Encounters",
    params(("X-User-Id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 200, description = "Sweep finished, possibly with zero encounters", body = EncounterCheckResponse),
        (status = 401, description = "Missing caller identity", body = ApiError),
        (status = 404, description = "Caller has no bird", body = ApiError),
    ),
)]
pub async fn check(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> ApiResult<Json<EncounterCheckResponse>> {
    let report = state.scanner.sweep_for_user(user_id).await?;
    tracing::debug!(
        user_id = %user_id,
        new_encounters = report.new_encounters.len(),
        "On-demand sweep finished"
    );
    Ok(Json(report.into()))
}

/// GET /api/encounters - The caller's 50 most recent encounters
#[utoipa::path(
    get,
    path = "/api/encounters",
    tag = "Encounters",
    params(("X-User-Id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 200, description = "Newest first", body = EncounterHistoryResponse),
        (status = 401, description = "Missing caller identity", body = ApiError),
        (status = 404, description = "Caller has no bird", body = ApiError),
    ),
)]
pub async fn history(
    State(store): State<Arc<dyn RecordStore>>,
    Caller(user_id): Caller,
) -> ApiResult<Json<EncounterHistoryResponse>> {
    let bird = caller_bird(store.as_ref(), user_id).await?;
    let encounters = encounter_history(store.as_ref(), bird.bird_id).await?;
    Ok(Json(EncounterHistoryResponse {
        bird_id: bird.bird_id,
        encounters,
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(history))
        .route("/check", post(check))
}
