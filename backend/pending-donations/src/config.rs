//! Application configuration loaded from environment variables.

use crate::errors::{DonationsError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the donation service (e.g. https://api.example.org/api)
    pub api_base_url: String,
    /// Bearer token forwarded on every request, if any
    pub api_token: Option<String>,
    /// Timeout (in seconds) applied to each HTTP request
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `from_env` uses the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                DonationsError::Config("API_BASE_URL environment variable is required".to_string())
            })?;

        Ok(Config {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            api_token: lookup("API_TOKEN").filter(|v| !v.is_empty()),
            request_timeout_secs: lookup("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|| "30".to_string())
                .parse()
                .map_err(|_| DonationsError::Config("Invalid REQUEST_TIMEOUT_SECS".to_string()))?,
        })
    }
}
