//! Relationship removal ("unfriend").

use axum::{extract::State, routing::delete, Json, Router};
use flyway_agents::remove_pair;

use crate::error::{ApiError, ApiResult};
use crate::extractors::Caller;
use crate::routes::caller_bird;
use crate::state::AppState;
use crate::types::{RemoveRelationshipRequest, RemoveRelationshipResponse};

/// DELETE /api/relationships - Drop both edges between the caller's bird and another
#[utoipa::path(
    delete,
    path = "/api/relationships",
    tag = "Relationships",
    params(("X-User-Id" = String, Header, description = "Caller's user id")),
    request_body = RemoveRelationshipRequest,
    responses(
        (status = 200, description = "Edges removed; encounters are kept", body = RemoveRelationshipResponse),
        (status = 400, description = "Tried to unfriend itself", body = ApiError),
        (status = 404, description = "Caller has no bird", body = ApiError),
    ),
)]
pub async fn remove_relationship(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(req): Json<RemoveRelationshipRequest>,
) -> ApiResult<Json<RemoveRelationshipResponse>> {
    let bird = caller_bird(state.store.as_ref(), user_id).await?;
    if bird.bird_id == req.other_bird_id {
        return Err(ApiError::invalid_input("A bird cannot unfriend itself"));
    }
    let removed = remove_pair(state.store.as_ref(), bird.bird_id, req.other_bird_id).await?;
    tracing::info!(
        bird_id = %bird.bird_id,
        other_bird_id = %req.other_bird_id,
        removed,
        "Relationship removed"
    );
    Ok(Json(RemoveRelationshipResponse {
        success: true,
        removed,
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", delete(remove_relationship))
}
