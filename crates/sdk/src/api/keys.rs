//! API key endpoints.

use crate::client::PromptliftClient;
use crate::error::ApiResult;
use serde::{Deserialize, Serialize};

/// Keys API for checking the configured credential.
pub struct KeysApi<'a> {
    client: &'a PromptliftClient,
}

impl<'a> KeysApi<'a> {
    pub(crate) fn new(client: &'a PromptliftClient) -> Self {
        Self { client }
    }

    /// Ask the service whether the configured key is accepted.
    pub async fn validate(&self) -> ApiResult<KeyStatus> {
        self.client.http.get("api/v1/keys/validate").await
    }
}

/// Subscription state attached to an API key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStatus {
    pub tier: String,
    #[serde(default, alias = "quotaUsed")]
    pub quota_used: u64,
    /// `None` means the tier has no monthly cap.
    #[serde(default, alias = "quotaLimit")]
    pub quota_limit: Option<u64>,
    pub status: String,
}

impl KeyStatus {
    pub fn quota_remaining(&self) -> Option<u64> {
        self.quota_limit
            .map(|limit| limit.saturating_sub(self.quota_used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_status_accepts_camel_case() {
        let status: KeyStatus = serde_json::from_value(serde_json::json!({
            "tier": "pro",
            "quotaUsed": 12,
            "quotaLimit": 100,
            "status": "active"
        }))
        .unwrap();
        assert_eq!(status.quota_used, 12);
        assert_eq!(status.quota_remaining(), Some(88));
    }

    #[test]
    fn test_unlimited_quota() {
        let status: KeyStatus = serde_json::from_value(serde_json::json!({
            "tier": "enterprise",
            "quota_used": 5000,
            "quota_limit": null,
            "status": "active"
        }))
        .unwrap();
        assert_eq!(status.quota_remaining(), None);
    }
}
