//! Environment-driven configuration

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Configuration for the backend HTTP client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL the `/api/...` paths are appended to
    pub api_url: String,
    pub request_timeout: Duration,
    /// Chunk size used when streaming image bytes (drives progress granularity)
    pub upload_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_BYTES,
        }
    }
}

impl ClientConfig {
    /// Read `PLANT_API_URL`, `PLANT_API_TIMEOUT_SECS` and `PLANT_UPLOAD_CHUNK_BYTES`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_url = lookup("PLANT_API_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_url);

        let request_timeout = parse_var(&lookup, "PLANT_API_TIMEOUT_SECS")
            .filter(|secs: &u64| *secs > 0)
            .map_or(defaults.request_timeout, Duration::from_secs);

        let upload_chunk_size = parse_var(&lookup, "PLANT_UPLOAD_CHUNK_BYTES")
            .filter(|bytes: &usize| *bytes > 0)
            .unwrap_or(defaults.upload_chunk_size);

        Self {
            api_url,
            request_timeout,
            upload_chunk_size,
        }
    }

    /// Full URL for an API path such as `/api/qa`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.api_url.trim_end_matches('/'))
    }
}

/// Per-session behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Open the log with the greeting message
    pub greeting: bool,
    /// Capacity of the intent and event channels
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: true,
            channel_capacity: 32,
        }
    }
}

impl SessionConfig {
    /// Read `PLANT_GREETING` (`0`, `false`, `off` disable the greeting)
    pub fn from_env() -> Self {
        let greeting = std::env::var("PLANT_GREETING")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off"))
            .unwrap_or(true);
        Self {
            greeting,
            ..Self::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}
