//! Flyway Telemetry
//!
//! Structured logging for the API process and HTTP request tracing.

pub mod tracer;

pub use tracer::{init_tracing, TelemetryConfig, DEFAULT_LOG_FILTER};

use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Request/response tracing for every route.
pub fn http_trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}
