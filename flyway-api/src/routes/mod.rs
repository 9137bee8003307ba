//! REST API Routes Module
//!
//! - Scan triggers: `/api/cron/check-encounters` (shared secret) and
//!   `/api/encounters/check` (caller's bird)
//! - Bird, species, encounter, conversation and relationship endpoints
//! - Admin reset at `/api/admin/reset-birds`
//! - Health checks at `/health/*`
//! - OpenAPI document at `/openapi.json`

pub mod bird;
pub mod conversations;
pub mod cron;
pub mod encounters;
pub mod health;
pub mod relationships;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use flyway_core::{Bird, UserId};
use flyway_storage::RecordStore;
use once_cell::sync::Lazy;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::extractors::USER_ID_HEADER;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::http_trace_layer;

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// The caller's bird, or 404 when the user has none yet.
pub(crate) async fn caller_bird(store: &dyn RecordStore, user_id: UserId) -> ApiResult<Bird> {
    store
        .bird_get_by_user(user_id)
        .await?
        .ok_or_else(|| ApiError::bird_not_found_for_user(user_id))
}

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

static OPENAPI: Lazy<utoipa::openapi::OpenApi> = Lazy::new(ApiDoc::openapi);

async fn openapi_json() -> impl IntoResponse {
    Json(OPENAPI.clone())
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the complete API router.
///
/// Layers, outer to inner: CORS, HTTP tracing, handler.
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let api_routes = Router::new()
        .merge(cron::create_router())
        .nest("/encounters", encounters::create_router())
        .nest("/conversations", conversations::create_router())
        .nest("/relationships", relationships::create_router())
        .nest("/bird", bird::create_router());

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health::create_router())
        .route("/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(http_trace_layer())
        .layer(build_cors_layer(api_config))
}
