//! Conversation transcripts, visible to the two birds that had them.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use flyway_agents::{conversation_detail, Transcript};
use flyway_core::ConversationId;
use flyway_storage::RecordStore;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::extractors::Caller;
use crate::routes::caller_bird;
use crate::state::AppState;

/// GET /api/conversations/{id} - One conversation with its messages
#[utoipa::path(
    get,
    path = "/api/conversations/{id}",
    tag = "Conversations",
    params(
        ("id" = String, Path, description = "Conversation id"),
        ("X-User-Id" = String, Header, description = "Caller's user id"),
    ),
    responses(
        (status = 200, description = "Messages in round order", body = Transcript),
        (status = 403, description = "Caller's bird was not in this encounter", body = ApiError),
        (status = 404, description = "No such conversation", body = ApiError),
    ),
)]
pub async fn get_conversation(
    State(store): State<Arc<dyn RecordStore>>,
    Caller(user_id): Caller,
    Path(conversation_id): Path<ConversationId>,
) -> ApiResult<Json<Transcript>> {
    let bird = caller_bird(store.as_ref(), user_id).await?;
    let transcript = conversation_detail(store.as_ref(), conversation_id, bird.bird_id).await?;
    Ok(Json(transcript))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/:id", get(get_conversation))
}
