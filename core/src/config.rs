//! Client configuration.
//!
//! Defaults point at a local development backend. `from_env` lets a host
//! override the base address and timeout without recompiling.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const BASE_URL_ENV: &str = "CYCLE_API_BASE_URL";
pub const TIMEOUT_ENV: &str = "CYCLE_API_TIMEOUT_SECS";

/// Settings for `ApiClient` and the production transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Absolute address every request path is appended to.
    pub base_url: String,
    /// Whole-request timeout applied by the transport.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: concat!("cycle-core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `CYCLE_API_BASE_URL` and `CYCLE_API_TIMEOUT_SECS`.
    ///
    /// An unparsable timeout is ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        config
    }
}
