//! Configuration types for the Promptlift SDK.

use promptlift_core::ApiKey;
use std::time::Duration;
use url::Url;

/// Base URL used when neither flags, environment nor stored config name one.
pub const DEFAULT_BASE_URL: &str = "https://api.promptlift.dev/";

/// Timeout applied to every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the Promptlift client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Promptlift API.
    pub base_url: Url,
    /// API key sent as a bearer token.
    pub api_key: ApiKey,
    /// Request timeout.
    pub timeout: Duration,
    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a new configuration with the given base URL and key.
    pub fn new(base_url: Url, api_key: ApiKey) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            api_key,
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("promptlift-sdk/{}", env!("CARGO_PKG_VERSION"))
}

/// Ensure the base URL ends with `/` so relative joins keep any path prefix.
pub fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ApiKey {
        ApiKey::parse("sk-test-0123456789abcdef").unwrap()
    }

    #[test]
    fn test_client_config_defaults() {
        let url = Url::parse("https://example.com").unwrap();
        let config = ClientConfig::new(url, key());

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("promptlift-sdk/"));
    }

    #[test]
    fn test_normalize_keeps_path_prefix() {
        let url = normalize_base_url(Url::parse("https://example.com/proxy").unwrap());
        assert_eq!(url.as_str(), "https://example.com/proxy/");
        assert_eq!(
            url.join("api/v1/health").unwrap().as_str(),
            "https://example.com/proxy/api/v1/health"
        );
    }

    #[test]
    fn test_normalize_root() {
        let url = normalize_base_url(Url::parse("http://localhost:8080").unwrap());
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }
}
