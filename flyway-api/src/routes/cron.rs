//! Shared-secret endpoints: the scheduled full sweep and the admin reset.

use axum::{extract::State, routing::{get, post}, Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::extractors::CronAuthorized;
use crate::state::AppState;
use crate::types::{CronSweepResponse, ResetBirdsResponse};

/// GET /api/cron/check-encounters - Run the full encounter sweep
#[utoipa::path(
    get,
    path = "/api/cron/check-encounters",
    tag = "Encounters",
    responses(
        (status = 200, description = "Sweep finished", body = CronSweepResponse),
        (status = 401, description = "Missing or wrong cron secret", body = ApiError),
    ),
    security(("cron_secret" = []))
)]
pub async fn check_encounters(
    _auth: CronAuthorized,
    State(state): State<AppState>,
) -> ApiResult<Json<CronSweepResponse>> {
    let report = state.scanner.sweep_all().await?;
    tracing::info!(
        new_encounters = report.new_encounters.len(),
        total_birds = report.total_birds,
        "Cron sweep finished"
    );
    Ok(Json(report.into()))
}

/// POST /api/admin/reset-birds - Delete every bird and its social history
#[utoipa::path(
    post,
    path = "/api/admin/reset-birds",
    tag = "Admin",
    responses(
        (status = 200, description = "All birds removed", body = ResetBirdsResponse),
        (status = 401, description = "Missing or wrong cron secret", body = ApiError),
    ),
    security(("cron_secret" = []))
)]
pub async fn reset_birds(
    _auth: CronAuthorized,
    State(state): State<AppState>,
) -> ApiResult<Json<ResetBirdsResponse>> {
    let summary = state.store.reset_birds().await?;
    tracing::warn!(
        birds = summary.birds,
        encounters = summary.encounters,
        "All birds reset by admin request"
    );
    Ok(Json(ResetBirdsResponse {
        success: true,
        deleted: summary.into(),
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/cron/check-encounters", get(check_encounters))
        .route("/admin/reset-birds", post(reset_birds))
}
