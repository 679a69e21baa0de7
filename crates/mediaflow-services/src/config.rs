//! Configuration for the generation service endpoints.

use std::time::Duration;

/// Environment variable overriding the default service base URL.
pub const BASE_URL_ENV: &str = "MEDIAFLOW_SERVICE_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection settings for the generation services.
///
/// All four capabilities are served from one base URL; generation
/// calls are slow, so the default timeout is generous.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the generation service host.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ServiceConfig {
    /// Create a config, honoring the `MEDIAFLOW_SERVICE_URL` override.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.is_empty() {
                config.base_url = base_url;
            }
        }
        config
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
