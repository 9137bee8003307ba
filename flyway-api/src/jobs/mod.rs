//! Background Jobs for the Flyway API
//!
//! - `encounter_sweep`: runs the full encounter sweep on a fixed interval
//!
//! # Usage
//!
//! ```ignore
//! use flyway_api::jobs::{encounter_sweep_task, EncounterSweepConfig, EncounterSweepMetrics};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let metrics = Arc::new(EncounterSweepMetrics::new());
//! tokio::spawn(encounter_sweep_task(scanner, config, metrics, shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod encounter_sweep;

pub use encounter_sweep::{
    encounter_sweep_task, EncounterSweepConfig, EncounterSweepMetrics, EncounterSweepSnapshot,
};
