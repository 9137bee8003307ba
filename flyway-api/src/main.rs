//! Flyway API Server Entry Point
//!
//! Wires the pipeline to the SecondMe client, starts the conversation
//! dispatcher and the sweep job, and serves the Axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use flyway_agents::{Pipeline, ThreadChance};
use flyway_core::FlywayConfig;
use flyway_llm::SecondMeClient;
use flyway_storage::InMemoryStore;
use tokio::sync::watch;

use flyway_api::{
    create_api_router, encounter_sweep_task, init_tracing, ApiConfig, ApiError, ApiResult,
    AppState, EncounterSweepConfig, TelemetryConfig,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    let api_config = ApiConfig::from_env();
    if api_config.cron_secret.is_none() {
        tracing::warn!("FLYWAY_CRON_SECRET is unset; cron and admin endpoints are open");
    }

    let secondme = Arc::new(SecondMeClient::from_env());
    let mut pipeline = Pipeline::new(
        Arc::new(InMemoryStore::new()),
        secondme.clone(),
        secondme,
        FlywayConfig::default(),
        Arc::new(ThreadChance),
    )?;
    let _dispatcher = pipeline.start_dispatcher();

    let state = AppState::new(&pipeline, api_config.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_job = EncounterSweepConfig::from_api_config(&api_config).map(|config| {
        tokio::spawn(encounter_sweep_task(
            state.scanner.clone(),
            config,
            state.sweep_metrics.clone(),
            shutdown_rx,
        ))
    });
    if sweep_job.is_none() {
        tracing::info!("Scheduled encounter sweep disabled");
    }

    let app: Router = create_api_router(state, &api_config);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Flyway API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    if let Some(job) = sweep_job {
        if let Err(e) = job.await {
            tracing::warn!(error = %e, "Encounter sweep task ended abnormally");
        }
    }
    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("FLYWAY_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("FLYWAY_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
