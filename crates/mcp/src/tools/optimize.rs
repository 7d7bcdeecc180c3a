// The optimize_prompt tool: argument validation and remote optimization

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_array, json_schema_enum, json_schema_object, json_schema_string, Tool};
use anyhow::Result;
use promptlift_core::{Goal, OptimizationRequest, OptimizationResult, RequestError};
use promptlift_sdk::{ApiError, PromptliftClient};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const OPTIMIZE_PROMPT: &str = "optimize_prompt";

/// Remote side of `optimize_prompt`.
#[async_trait::async_trait]
pub trait OptimizationBackend: Send + Sync {
    async fn optimize(&self, request: &OptimizationRequest)
        -> Result<OptimizationResult, ApiError>;
}

#[async_trait::async_trait]
impl OptimizationBackend for PromptliftClient {
    async fn optimize(
        &self,
        request: &OptimizationRequest,
    ) -> Result<OptimizationResult, ApiError> {
        self.prompts().optimize(request).await
    }
}

/// Why a call's arguments were rejected. Rendered to the user as a tool result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required argument 'prompt'. Provide the text you want optimized.")]
    MissingPrompt,

    #[error("Argument 'prompt' must be a string.")]
    PromptNotString,

    #[error("Prompt is empty. Provide the text you want optimized.")]
    EmptyPrompt,
}

impl From<RequestError> for ValidationError {
    fn from(e: RequestError) -> Self {
        match e {
            RequestError::EmptyPrompt => Self::EmptyPrompt,
        }
    }
}

/// Check `optimize_prompt` arguments and build the request.
///
/// Unknown goal tags are dropped silently, keeping the caller's order. If no
/// known goal remains, the default goal is used instead of failing.
pub fn validate_arguments(arguments: &Value) -> Result<OptimizationRequest, ValidationError> {
    let prompt = match arguments.get("prompt") {
        None | Some(Value::Null) => return Err(ValidationError::MissingPrompt),
        Some(Value::String(prompt)) => prompt,
        Some(_) => return Err(ValidationError::PromptNotString),
    };

    let goals = filter_goals(arguments.get("goals"));
    Ok(OptimizationRequest::new(prompt, goals)?)
}

/// Keep the recognised goal tags from a `goals` argument, in order.
pub fn filter_goals(goals: Option<&Value>) -> Vec<Goal> {
    let Some(Value::Array(items)) = goals else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let tag = item.as_str()?;
            match tag.parse::<Goal>() {
                Ok(goal) => Some(goal),
                Err(_) => {
                    debug!(goal = tag, "Ignoring unknown goal");
                    None
                }
            }
        })
        .collect()
}

/// Text shown to the user for a successful optimization.
pub fn render_success(request: &OptimizationRequest, result: &OptimizationResult) -> String {
    let goals = if result.goals_applied.is_empty() {
        request
            .goals()
            .iter()
            .map(Goal::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        result.goals_applied.join(", ")
    };

    let quota = match result.metadata.quota_remaining {
        Some(remaining) => remaining.to_string(),
        None => "unknown".to_string(),
    };

    format!(
        "Optimized prompt:\n\n{}\n\nConfidence: {:.2}\nGoals applied: {}\nQuota remaining: {}",
        result.optimized_prompt.trim(),
        result.confidence_score,
        goals,
        quota
    )
}

/// Text shown to the user when the remote call failed.
pub fn describe_failure(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized => "Your Promptlift API key was rejected. Run \
            `promptlift-mcp setup <API_KEY>` with a valid key and restart the server."
            .to_string(),
        ApiError::Forbidden => "Your API key is not permitted to optimize prompts. \
            Check your subscription tier."
            .to_string(),
        ApiError::RateLimited {
            retry_after_secs: Some(secs),
        } => format!("Rate limit reached. Try again in {} seconds.", secs),
        ApiError::RateLimited {
            retry_after_secs: None,
        } => "Rate limit reached. Try again later.".to_string(),
        ApiError::BadRequest { message, .. } => {
            format!("The optimization request was rejected: {}", message)
        }
        ApiError::ServerError { status, message } => format!(
            "The optimization service failed (status {}): {}. The call may be retried.",
            status, message
        ),
        ApiError::Unreachable {
            timed_out: true, ..
        } => "The optimization service did not respond in time.".to_string(),
        ApiError::Unreachable { reason, .. } => {
            format!("Could not reach the optimization service: {}", reason)
        }
        ApiError::InvalidResponse(detail) => format!(
            "The optimization service returned an unexpected response: {}",
            detail
        ),
        ApiError::Config(detail) => format!("Bridge configuration error: {}", detail),
    }
}

/// Tool that sends a prompt to the remote optimizer.
pub struct OptimizePromptTool {
    backend: Arc<dyn OptimizationBackend>,
}

impl OptimizePromptTool {
    pub fn new(backend: Arc<dyn OptimizationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait::async_trait]
impl Tool for OptimizePromptTool {
    fn schema(&self) -> ToolSchema {
        let goal_names: Vec<&str> = Goal::ALL.iter().map(Goal::as_str).collect();
        let goal_help = Goal::ALL
            .iter()
            .map(|goal| format!("{} ({})", goal.as_str(), goal.description()))
            .collect::<Vec<_>>()
            .join("; ");

        let mut goals = json_schema_array(
            json_schema_enum(&goal_names),
            &format!("Optimization goals to apply. Available: {}", goal_help),
        );
        goals["default"] = serde_json::json!([Goal::DEFAULT.as_str()]);

        ToolSchema {
            name: OPTIMIZE_PROMPT.to_string(),
            description: "Optimize a prompt for large language models. Returns the \
                rewritten prompt with a confidence score, the goals applied and the \
                remaining quota."
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "prompt": json_schema_string("The prompt text to optimize"),
                    "goals": goals
                }),
                vec!["prompt"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let request = match validate_arguments(&arguments) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Rejected optimize_prompt arguments");
                return Ok(CallToolResult::error(e.to_string()));
            }
        };

        match self.backend.optimize(&request).await {
            Ok(result) => {
                info!(
                    confidence = result.confidence_score,
                    quota_remaining = ?result.metadata.quota_remaining,
                    "Prompt optimized"
                );
                Ok(CallToolResult::text(render_success(&request, &result)))
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Prompt optimization failed");
                Ok(CallToolResult::error(describe_failure(&e)))
            }
        }
    }
}
