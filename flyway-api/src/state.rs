//! Shared application state for Axum routers.

use std::sync::Arc;

use flyway_agents::{BirdService, DispatchMetrics, EncounterScanner, Pipeline};
use flyway_storage::RecordStore;

use crate::config::ApiConfig;
use crate::jobs::EncounterSweepMetrics;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub scanner: Arc<EncounterScanner>,
    pub birds: Arc<BirdService>,
    pub dispatch_metrics: Arc<DispatchMetrics>,
    /// Counters of the background sweep job, zero when it is disabled.
    pub sweep_metrics: Arc<EncounterSweepMetrics>,
    pub api_config: Arc<ApiConfig>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Share the pipeline's services with the HTTP layer.
    pub fn new(pipeline: &Pipeline, api_config: ApiConfig) -> Self {
        Self {
            store: pipeline.store.clone(),
            scanner: pipeline.scanner.clone(),
            birds: pipeline.birds.clone(),
            dispatch_metrics: pipeline.metrics.clone(),
            sweep_metrics: Arc::new(EncounterSweepMetrics::new()),
            api_config: Arc::new(api_config),
            start_time: std::time::Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<dyn RecordStore>, store);
crate::impl_from_ref!(Arc<EncounterScanner>, scanner);
crate::impl_from_ref!(Arc<BirdService>, birds);
crate::impl_from_ref!(Arc<ApiConfig>, api_config);
