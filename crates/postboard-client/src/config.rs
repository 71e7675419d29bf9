//! Client configuration loaded from environment variables.
//!
//! Every setting has a default that points at a locally running server.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    /// Env: `POSTBOARD_API_URL`
    /// Default: `http://localhost:4000/api`
    pub api_url: String,

    /// Delay between background refreshes.
    /// Env: `POSTBOARD_POLL_INTERVAL_MS`
    /// Default: 3000 ms
    pub poll_interval: Duration,

    /// Upper bound on a single request, after which it fails as a network failure.
    /// Env: `POSTBOARD_REQUEST_TIMEOUT_SECS`
    /// Default: 10 s
    pub request_timeout: Duration,

    /// File remembering the selected sender across restarts.
    /// Env: `POSTBOARD_IDENTITY_FILE`
    /// Default: none
    pub identity_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:4000/api".to_string(),
            poll_interval: Duration::from_millis(3000),
            request_timeout: Duration::from_secs(10),
            identity_file: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = std::env::var("POSTBOARD_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        Self {
            api_url,
            poll_interval: env_parse("POSTBOARD_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            request_timeout: env_parse("POSTBOARD_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            identity_file: std::env::var("POSTBOARD_IDENTITY_FILE")
                .ok()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable {}={:?}, using default", key, raw);
            None
        }
    }
}
