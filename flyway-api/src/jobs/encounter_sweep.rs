//! Scheduled Encounter Sweep
//!
//! Runs `EncounterScanner::sweep_all` on an interval so birds keep meeting
//! without an external cron caller. The HTTP cron endpoint stays available
//! alongside it; both paths share the scanner's pair dedup window, so a pair
//! never meets twice inside that window no matter which path found it.

use flyway_agents::{EncounterScanner, SweepReport};
use flyway_core::FlywayResult;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::ApiConfig;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct EncounterSweepConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Skip the sweep that would otherwise run right at startup
    pub skip_first_tick: bool,
}

impl EncounterSweepConfig {
    /// Build from the API configuration; `None` when the job is disabled.
    pub fn from_api_config(config: &ApiConfig) -> Option<Self> {
        config.sweep_interval().map(|interval| Self {
            interval,
            skip_first_tick: true,
        })
    }
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Default)]
pub struct EncounterSweepMetrics {
    /// Sweeps that finished
    pub sweeps: AtomicU64,
    /// Encounters created across all sweeps
    pub encounters_created: AtomicU64,
    /// Pairs skipped because of a per-pair error
    pub failed_pairs: AtomicU64,
    /// Sweeps that aborted as a whole
    pub sweep_errors: AtomicU64,
}

impl EncounterSweepMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> EncounterSweepSnapshot {
        EncounterSweepSnapshot {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            encounters_created: self.encounters_created.load(Ordering::Relaxed),
            failed_pairs: self.failed_pairs.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }

    fn record(&self, result: &FlywayResult<SweepReport>) {
        match result {
            Ok(report) => {
                self.sweeps.fetch_add(1, Ordering::Relaxed);
                self.encounters_created
                    .fetch_add(report.new_encounters.len() as u64, Ordering::Relaxed);
                self.failed_pairs
                    .fetch_add(report.failed_pairs as u64, Ordering::Relaxed);
            }
            Err(_) => {
                self.sweep_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Snapshot of sweep metrics at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EncounterSweepSnapshot {
    pub sweeps: u64,
    pub encounters_created: u64,
    pub failed_pairs: u64,
    pub sweep_errors: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Sweep every `config.interval` until `shutdown_rx` turns true.
///
/// A failed sweep is logged and counted; the next tick tries again.
pub async fn encounter_sweep_task(
    scanner: Arc<EncounterScanner>,
    config: EncounterSweepConfig,
    metrics: Arc<EncounterSweepMetrics>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<EncounterSweepMetrics> {
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    if config.skip_first_tick {
        ticker.tick().await;
    }

    tracing::info!(
        interval_secs = config.interval.as_secs(),
        "Encounter sweep task started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Encounter sweep task shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                run_sweep(&scanner, &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        sweeps = snapshot.sweeps,
        encounters_created = snapshot.encounters_created,
        failed_pairs = snapshot.failed_pairs,
        sweep_errors = snapshot.sweep_errors,
        "Encounter sweep task completed"
    );

    metrics
}

async fn run_sweep(scanner: &EncounterScanner, metrics: &EncounterSweepMetrics) {
    let result = scanner.sweep_all().await;
    metrics.record(&result);
    match result {
        Ok(report) if report.new_encounters.is_empty() => {
            tracing::trace!(checked_pairs = report.checked_pairs, "Scheduled sweep found nothing");
        }
        Ok(report) => {
            tracing::info!(
                new_encounters = report.new_encounters.len(),
                checked_pairs = report.checked_pairs,
                "Scheduled sweep created encounters"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Scheduled sweep failed");
        }
    }
}
