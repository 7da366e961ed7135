//! Client configuration (environment variables with defaults)

use docbatch_core::application::PollConfig;
use docbatch_core::error::{AppError, Result};
use docbatch_infra_http::HttpGatewayConfig;
use std::time::Duration;

pub const ENV_API_URL: &str = "DOCBATCH_API_URL";
pub const ENV_TOKEN: &str = "DOCBATCH_TOKEN";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "DOCBATCH_HTTP_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL_MS: &str = "DOCBATCH_POLL_INTERVAL_MS";
pub const ENV_MAX_POLL_FAILURES: &str = "DOCBATCH_MAX_POLL_FAILURES";

/// Everything needed to build a [`crate::DocbatchClient`]
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub http: HttpGatewayConfig,
    /// Stored access token; `None` restores a guest session
    pub access_token: Option<String>,
    pub poll: PollConfig,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: HttpGatewayConfig::new(api_url),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Load from `DOCBATCH_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, test map, ...)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config.http.base_url = url;
        }
        config.access_token = lookup(ENV_TOKEN);

        if let Some(secs) = parse_var::<u64>(&lookup, ENV_HTTP_TIMEOUT_SECS)? {
            // A zero timeout would fail every request before it is sent
            if secs == 0 {
                return Err(AppError::Config(format!("{} must be at least 1", ENV_HTTP_TIMEOUT_SECS)));
            }
            config.http.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_POLL_INTERVAL_MS)? {
            config.poll.interval = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<u32>(&lookup, ENV_MAX_POLL_FAILURES)? {
            if n == 0 {
                return Err(AppError::Config(format!("{} must be at least 1", ENV_MAX_POLL_FAILURES)));
            }
            config.poll.max_consecutive_failures = n;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("invalid {}={:?}: {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.http.base_url, HttpGatewayConfig::default().base_url);
        assert!(config.access_token.is_none());
        assert_eq!(config.poll.interval, PollConfig::default().interval);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://docs.example.com/api/v1"),
            (ENV_TOKEN, "tok"),
            (ENV_HTTP_TIMEOUT_SECS, "5"),
            (ENV_POLL_INTERVAL_MS, "750"),
            (ENV_MAX_POLL_FAILURES, "8"),
        ]))
        .unwrap();

        assert_eq!(config.http.base_url, "https://docs.example.com/api/v1");
        assert_eq!(config.access_token.as_deref(), Some("tok"));
        assert_eq!(config.http.request_timeout, Duration::from_secs(5));
        assert_eq!(config.poll.interval, Duration::from_millis(750));
        assert_eq!(config.poll.max_consecutive_failures, 8);
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_POLL_INTERVAL_MS, "soon")])).unwrap_err();
        assert!(err.to_string().contains(ENV_POLL_INTERVAL_MS));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_MAX_POLL_FAILURES, "0")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_HTTP_TIMEOUT_SECS, "0")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains(ENV_HTTP_TIMEOUT_SECS));

        let config = ClientConfig::from_lookup(lookup(&[(ENV_HTTP_TIMEOUT_SECS, "1")])).unwrap();
        assert_eq!(config.http.request_timeout, Duration::from_secs(1));
    }
}
