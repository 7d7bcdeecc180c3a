//! Settings resolution and the credential check done before serving.
//!
//! Precedence for each setting: explicit override (flag or environment),
//! then the stored record, then the built-in default.

use promptlift_core::{ApiKey, KeyFormatError, StoredConfig};
use promptlift_sdk::{ApiError, KeyStatus, PromptliftClient, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use std::time::Duration;
use tracing::{info, warn};

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub timeout: Duration,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Effective settings for one process run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: ApiKey,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("No API key configured. Run `promptlift-mcp setup <API_KEY>` or set PROMPTLIFT_API_KEY")]
    MissingCredential,

    #[error("Configured API key is malformed: {0}")]
    MalformedCredential(#[from] KeyFormatError),

    #[error("Failed to create client: {0}")]
    Client(#[source] ApiError),

    #[error("API key was rejected by the service: {0}")]
    Rejected(#[source] ApiError),
}

/// Merge overrides with the stored record.
pub fn resolve(overrides: &Overrides, stored: Option<StoredConfig>) -> Result<Settings, StartupError> {
    let stored = stored.unwrap_or_default();

    let raw_key = non_blank(overrides.api_key.as_deref())
        .or_else(|| non_blank(stored.api_key.as_deref()))
        .ok_or(StartupError::MissingCredential)?;
    let api_key = ApiKey::parse(raw_key)?;

    let base_url = non_blank(overrides.api_url.as_deref())
        .or_else(|| non_blank(stored.backend_url.as_deref()))
        .unwrap_or(DEFAULT_BASE_URL)
        .to_string();

    Ok(Settings {
        api_key,
        base_url,
        timeout: overrides.timeout,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn build_client(settings: &Settings) -> Result<PromptliftClient, StartupError> {
    PromptliftClient::builder()
        .base_url(settings.base_url.clone())
        .api_key(settings.api_key.clone())
        .timeout(settings.timeout)
        .user_agent(format!("promptlift-mcp/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(StartupError::Client)
}

/// Ask the service whether the key is accepted.
///
/// Only an explicit rejection is fatal. Any other failure is logged and the
/// caller proceeds without a status.
pub async fn verify_credential(client: &PromptliftClient) -> Result<Option<KeyStatus>, StartupError> {
    match client.keys().validate().await {
        Ok(status) => {
            info!(
                key = %client.config().api_key,
                tier = %status.tier,
                quota_used = status.quota_used,
                quota_remaining = ?status.quota_remaining(),
                "API key accepted"
            );
            Ok(Some(status))
        }
        Err(e @ (ApiError::Unauthorized | ApiError::Forbidden)) => Err(StartupError::Rejected(e)),
        Err(e) => {
            warn!(error = %e, "Could not validate API key, continuing");
            Ok(None)
        }
    }
}
