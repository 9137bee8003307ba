//! API Configuration Module
//!
//! CORS, the shared cron secret and the scheduled sweep interval. Loaded
//! from environment variables with development-friendly defaults.

use std::time::Duration;

/// Default interval of the background encounter sweep (one hour).
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Scan trigger
    // ========================================================================
    /// Shared secret for the cron and admin endpoints.
    /// `None` leaves those endpoints open.
    pub cron_secret: Option<String>,

    /// Interval of the in-process sweep job; 0 disables it.
    pub sweep_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
            cron_secret: None,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `FLYWAY_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `FLYWAY_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `FLYWAY_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `FLYWAY_CRON_SECRET`: Bearer secret for cron/admin endpoints (default: unset)
    /// - `FLYWAY_SWEEP_INTERVAL_SECS`: Background sweep interval, 0 disables (default: 3600)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("FLYWAY_CORS_ORIGINS")
            .ok()
            .map(|s| parse_origins(&s))
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("FLYWAY_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("FLYWAY_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let cron_secret = std::env::var("FLYWAY_CRON_SECRET")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let sweep_interval_secs = std::env::var("FLYWAY_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            cron_secret,
            sweep_interval_secs,
        }
    }

    pub fn with_cron_secret(mut self, secret: impl Into<String>) -> Self {
        self.cron_secret = Some(secret.into());
        self
    }

    /// Background sweep interval, `None` when the job is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.flyway.app
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain
                        .strip_suffix(pattern)
                        .is_some_and(|sub| sub.ends_with('.'))
                        || origin_domain == pattern;
                }
            }
            false
        })
    }

    /// Whether `header` is an `Authorization` value carrying the cron secret.
    ///
    /// Always true when no secret is configured.
    pub fn cron_authorized(&self, header: Option<&str>) -> bool {
        match &self.cron_secret {
            None => true,
            Some(secret) => header
                .and_then(|h| h.strip_prefix("Bearer "))
                .is_some_and(|token| token.trim() == secret),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("cors_origins", &self.cors_origins)
            .field("cors_allow_credentials", &self.cors_allow_credentials)
            .field("cors_max_age_secs", &self.cors_max_age_secs)
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "[REDACTED]"))
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}
