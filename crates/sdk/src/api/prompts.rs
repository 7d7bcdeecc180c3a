//! Prompt optimization endpoints.

use crate::client::PromptliftClient;
use crate::error::{ApiError, ApiResult};
use promptlift_core::{OptimizationRequest, OptimizationResult};
use tracing::debug;

/// Name of the single query parameter carrying the encoded request.
pub const INPUT_PARAM: &str = "input";

/// Prompts API for optimization calls.
pub struct PromptsApi<'a> {
    client: &'a PromptliftClient,
}

impl<'a> PromptsApi<'a> {
    pub(crate) fn new(client: &'a PromptliftClient) -> Self {
        Self { client }
    }

    /// Optimize a prompt.
    ///
    /// The request travels as one opaque query parameter so it works through
    /// gateways that only forward flat URL parameters.
    pub async fn optimize(&self, request: &OptimizationRequest) -> ApiResult<OptimizationResult> {
        let token = encode_request(request)?;
        debug!(
            goals = request.goals().len(),
            prompt_len = request.prompt().len(),
            "Optimizing prompt"
        );

        self.client
            .http
            .get_with_query("api/v1/optimize", &[(INPUT_PARAM, token.as_str())])
            .await
    }
}

/// Encode a request as a single transportable token.
pub fn encode_request(request: &OptimizationRequest) -> ApiResult<String> {
    serde_json::to_string(request)
        .map_err(|e| ApiError::Config(format!("failed to encode request: {}", e)))
}
