// HTTP Client Setup

use docbatch_core::error::{AppError, Result};
use reqwest::Url;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP gateway configuration
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// API base URL; endpoint paths are appended to it
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HttpGatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl HttpGatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Parsed base URL; rejects URLs that cannot carry a path
    pub fn parsed_base(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("invalid API URL {}: {}", self.base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "API URL cannot carry a path: {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Join an already-encoded endpoint path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Append `segments` to `base`, each percent-encoded as exactly one path segment
pub fn endpoint_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Build the reqwest client with timeouts and a descriptive user agent
pub fn build_client(config: &HttpGatewayConfig) -> Result<reqwest::Client> {
    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        return Err(AppError::Config(format!(
            "API URL must start with http:// or https://: {}",
            config.base_url
        )));
    }

    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(concat!("docbatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joining() {
        let config = HttpGatewayConfig::new("https://docs.example.com/api/v1/");
        assert_eq!(
            config.endpoint("/jobs/j1/cancel"),
            "https://docs.example.com/api/v1/jobs/j1/cancel"
        );
        assert_eq!(
            HttpGatewayConfig::new("http://localhost:8000").endpoint("workspaces/w/jobs"),
            "http://localhost:8000/workspaces/w/jobs"
        );
    }

    #[test]
    fn test_build_client_rejects_bad_scheme() {
        let err = build_client(&HttpGatewayConfig::new("ftp://example.com")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(build_client(&HttpGatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_endpoint_url_encodes_ids() {
        let base = HttpGatewayConfig::new("http://127.0.0.1:8000/api/v1/")
            .parsed_base()
            .unwrap();
        let url = endpoint_url(&base, &["jobs", "a/b?c#d", "cancel"]);
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/api/v1/jobs/a%2Fb%3Fc%23d/cancel"
        );
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_parsed_base_rejects_garbage() {
        assert!(matches!(
            HttpGatewayConfig::new("not a url").parsed_base(),
            Err(AppError::Config(_))
        ));
    }
}
