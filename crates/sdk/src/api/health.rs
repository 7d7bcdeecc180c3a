//! Health API endpoints.

use crate::client::PromptliftClient;
use crate::error::ApiResult;
use serde::{Deserialize, Serialize};

/// Health API for checking service status.
pub struct HealthApi<'a> {
    client: &'a PromptliftClient,
}

impl<'a> HealthApi<'a> {
    pub(crate) fn new(client: &'a PromptliftClient) -> Self {
        Self { client }
    }

    /// Check service health. Any transport failure surfaces as `Unreachable`.
    pub async fn check(&self) -> ApiResult<HealthStatus> {
        self.client.http.get("api/v1/health").await
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "healthy")
    }
}
