//! Main client for the Promptlift SDK.

use crate::api::*;
use crate::config::{default_user_agent, normalize_base_url, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::{ApiError, ApiResult};
use crate::transport::HttpTransport;
use promptlift_core::ApiKey;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Client for the Promptlift optimization service.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct PromptliftClient {
    config: Arc<ClientConfig>,
    pub(crate) http: HttpTransport,
}

impl PromptliftClient {
    /// Create a new client builder.
    pub fn builder() -> PromptliftClientBuilder {
        PromptliftClientBuilder::new()
    }

    /// Create a client from configuration.
    pub fn from_config(config: ClientConfig) -> ApiResult<Self> {
        let config = Arc::new(config);
        let http = HttpTransport::new(config.clone())?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the health API.
    pub fn health(&self) -> HealthApi<'_> {
        HealthApi::new(self)
    }

    /// Get the keys API.
    pub fn keys(&self) -> KeysApi<'_> {
        KeysApi::new(self)
    }

    /// Get the prompts API.
    pub fn prompts(&self) -> PromptsApi<'_> {
        PromptsApi::new(self)
    }
}

/// Builder for creating a PromptliftClient.
pub struct PromptliftClientBuilder {
    base_url: Option<String>,
    api_key: Option<ApiKey>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl PromptliftClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the base URL of the Promptlift API. Defaults to [`DEFAULT_BASE_URL`].
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the API key for authentication.
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> ApiResult<PromptliftClient> {
        let api_key = self
            .api_key
            .ok_or_else(|| ApiError::Config("api_key is required".to_string()))?;

        let base_url = Url::parse(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "unsupported URL scheme: {}",
                base_url.scheme()
            )));
        }

        let config = ClientConfig {
            base_url: normalize_base_url(base_url),
            api_key,
            timeout: self.timeout,
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
        };

        PromptliftClient::from_config(config)
    }
}

impl Default for PromptliftClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
