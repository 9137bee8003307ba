//! Flyway API - HTTP surface of the bird simulation
//!
//! Axum routes for the scan triggers and the bird-facing read/write
//! endpoints, the scheduled sweep job, and process telemetry.

pub mod config;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod macros;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use extractors::{Caller, CronAuthorized};
pub use jobs::{encounter_sweep_task, EncounterSweepConfig, EncounterSweepMetrics};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::AppState;
pub use telemetry::{init_tracing, TelemetryConfig};
