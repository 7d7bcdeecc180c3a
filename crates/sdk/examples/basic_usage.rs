//! Basic SDK usage example.
//!
//! Checks service health, validates the key and optimizes one prompt.
//!
//! Run with: PROMPTLIFT_API_KEY=sk-... cargo run --example basic_usage

use promptlift_core::{ApiKey, Goal, OptimizationRequest};
use promptlift_sdk::{ApiError, ApiResult, PromptliftClient};
use std::time::Duration;

#[tokio::main]
async fn main() -> ApiResult<()> {
    tracing_subscriber::fmt::init();

    let raw_key = std::env::var("PROMPTLIFT_API_KEY")
        .map_err(|_| ApiError::Config("PROMPTLIFT_API_KEY is not set".to_string()))?;
    let api_key = ApiKey::parse(&raw_key).map_err(|e| ApiError::Config(e.to_string()))?;

    let client = PromptliftClient::builder()
        .api_key(api_key)
        .timeout(Duration::from_secs(30))
        .build()?;

    println!("Checking service health...");
    let health = client.health().check().await?;
    println!("Service status: {}", health.status);

    let status = client.keys().validate().await?;
    println!("\nKey tier: {} ({})", status.tier, status.status);
    match status.quota_remaining() {
        Some(remaining) => println!("Quota remaining: {}", remaining),
        None => println!("Quota: unlimited"),
    }

    let request = OptimizationRequest::new(
        "write a function that sorts things",
        [Goal::Specificity, Goal::TechnicalAccuracy],
    )
    .map_err(|e| ApiError::Config(e.to_string()))?;

    println!("\nOptimizing...");
    match client.prompts().optimize(&request).await {
        Ok(result) => {
            println!("{}", result.optimized_prompt);
            println!("\nConfidence: {:.2}", result.confidence_score);
        }
        Err(e) if e.is_retryable() => println!("Temporary failure, try again later: {}", e),
        Err(e) => return Err(e),
    }

    Ok(())
}
