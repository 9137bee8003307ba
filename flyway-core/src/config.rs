//! Configuration types

use crate::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Caps used when turning a finished conversation into a relationship delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RelationshipDeltaConfig {
    pub base: u32,
    pub per_turn: u32,
    /// Turns beyond this count add nothing
    pub max_counted_turns: u32,
    pub per_keyword: u32,
    pub max_delta: u32,
}

impl Default for RelationshipDeltaConfig {
    fn default() -> Self {
        Self {
            base: 5,
            per_turn: 2,
            max_counted_turns: 5,
            per_keyword: 2,
            max_delta: 25,
        }
    }
}

/// Pipeline tunables. `Default` reproduces the hand-tuned constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FlywayConfig {
    // Admission control
    pub conversation_threshold: u32,
    /// Max distance in degrees for two birds to meet
    pub encounter_distance: f64,
    /// Window in which a second encounter of the same pair is suppressed
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub dedup_window: Duration,

    // Conversation driver
    pub min_rounds: u32,
    pub max_rounds: u32,
    pub early_stop_probability: f64,

    // Credentials
    /// Refresh when the access token expires within this window
    #[cfg_attr(feature = "openapi", schema(value_type = u64))]
    pub token_refresh_leeway: Duration,

    pub relationship: RelationshipDeltaConfig,
}

impl Default for FlywayConfig {
    fn default() -> Self {
        Self {
            conversation_threshold: 60,
            encounter_distance: 5.0,
            dedup_window: Duration::from_secs(24 * 60 * 60),
            min_rounds: 3,
            max_rounds: 5,
            early_stop_probability: 0.3,
            token_refresh_leeway: Duration::from_secs(5 * 60),
            relationship: RelationshipDeltaConfig::default(),
        }
    }
}

impl FlywayConfig {
    /// Validate the configuration.
    ///
    /// Validates:
    /// - conversation_threshold <= 100
    /// - encounter_distance is finite and non-negative
    /// - 1 <= min_rounds <= max_rounds
    /// - early_stop_probability in [0.0, 1.0]
    /// - dedup_window is positive
    /// - relationship.max_delta > 0
    pub fn validate(&self) -> FlywayResult<()> {
        if self.conversation_threshold > 100 {
            return Err(invalid(
                "conversation_threshold",
                self.conversation_threshold,
                "conversation_threshold must be at most 100",
            ));
        }

        if !self.encounter_distance.is_finite() || self.encounter_distance < 0.0 {
            return Err(invalid(
                "encounter_distance",
                self.encounter_distance,
                "encounter_distance must be a non-negative number",
            ));
        }

        if self.min_rounds == 0 {
            return Err(invalid("min_rounds", self.min_rounds, "min_rounds must be at least 1"));
        }

        if self.min_rounds > self.max_rounds {
            return Err(invalid(
                "max_rounds",
                self.max_rounds,
                "max_rounds must be >= min_rounds",
            ));
        }

        if !(0.0..=1.0).contains(&self.early_stop_probability) {
            return Err(invalid(
                "early_stop_probability",
                self.early_stop_probability,
                "early_stop_probability must be between 0.0 and 1.0",
            ));
        }

        if self.dedup_window.is_zero() {
            return Err(invalid(
                "dedup_window",
                format!("{:?}", self.dedup_window),
                "dedup_window must be positive",
            ));
        }

        if self.relationship.max_delta == 0 {
            return Err(invalid(
                "relationship.max_delta",
                self.relationship.max_delta,
                "max_delta must be positive",
            ));
        }

        Ok(())
    }

    /// Dedup window as a chrono duration for timestamp arithmetic.
    pub fn dedup_window_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.dedup_window).unwrap_or(chrono::Duration::hours(24))
    }

    pub fn token_refresh_leeway_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.token_refresh_leeway).unwrap_or(chrono::Duration::minutes(5))
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> FlywayError {
    FlywayError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}
