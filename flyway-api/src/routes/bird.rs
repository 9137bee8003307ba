//! The caller's bird and the species catalog.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use flyway_agents::birds::current_activity;
use flyway_agents::BirdService;
use flyway_core::{all_species, find_species};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::extractors::Caller;
use crate::state::AppState;
use crate::types::{
    BirdResponse, ChangeSpeciesRequest, ChangeSpeciesResponse, SpeciesCatalogResponse,
    SpeciesView,
};

/// GET /api/bird - The caller's bird, relocated for the current month
///
/// A user without a bird gets one matched to their interest tags.
#[utoipa::path(
    get,
    path = "/api/bird",
    tag = "Birds",
    params(("X-User-Id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 200, description = "Bird with its species card", body = BirdResponse),
        (status = 404, description = "Unknown user", body = ApiError),
    ),
)]
pub async fn get_bird(
    State(birds): State<Arc<BirdService>>,
    Caller(user_id): Caller,
) -> ApiResult<Json<BirdResponse>> {
    let bird = birds.ensure_bird(user_id).await?;
    let species = find_species(&bird.species_id).map(SpeciesView::from);
    let activity = current_activity(&bird.species_id, None);
    Ok(Json(BirdResponse {
        bird,
        species,
        activity,
    }))
}

/// GET /api/bird/species - Every species a bird can be
#[utoipa::path(
    get,
    path = "/api/bird/species",
    tag = "Birds",
    responses(
        (status = 200, description = "Species catalog", body = SpeciesCatalogResponse),
    ),
)]
pub async fn list_species() -> Json<SpeciesCatalogResponse> {
    Json(SpeciesCatalogResponse {
        species: all_species().iter().map(SpeciesView::from).collect(),
    })
}

/// POST /api/bird/change - Switch the caller's bird to another species
///
/// Clears the bird's encounters, conversations and relationships.
#[utoipa::path(
    post,
    path = "/api/bird/change",
    tag = "Birds",
    params(("X-User-Id" = String, Header, description = "Caller's user id")),
    request_body = ChangeSpeciesRequest,
    responses(
        (status = 200, description = "Species switched", body = ChangeSpeciesResponse),
        (status = 400, description = "Unknown species", body = ApiError),
        (status = 404, description = "Unknown user", body = ApiError),
    ),
)]
pub async fn change_species(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    Json(req): Json<ChangeSpeciesRequest>,
) -> ApiResult<Json<ChangeSpeciesResponse>> {
    let species_id = req.species_id.trim();
    if species_id.is_empty() {
        return Err(ApiError::missing_field("species_id"));
    }
    let switched = state.birds.switch_species(user_id, species_id).await?;
    Ok(Json(ChangeSpeciesResponse {
        success: true,
        bird: switched.bird,
        cleared: switched.cleared.into(),
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_bird))
        .route("/species", get(list_species))
        .route("/change", post(change_species))
}
