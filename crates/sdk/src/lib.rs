//! # Promptlift SDK
//!
//! Rust client for the Promptlift prompt optimization API.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use promptlift_core::{ApiKey, Goal, OptimizationRequest};
//! use promptlift_sdk::{ApiResult, PromptliftClient};
//!
//! # async fn example() -> ApiResult<()> {
//! let key = ApiKey::parse("sk-your-api-key-0123456789").expect("well-formed key");
//! let client = PromptliftClient::builder().api_key(key).build()?;
//!
//! let status = client.keys().validate().await?;
//! println!("Tier: {}", status.tier);
//!
//! let request = OptimizationRequest::new("help me code", [Goal::Clarity]).expect("non-empty");
//! let result = client.prompts().optimize(&request).await?;
//! println!("{}", result.optimized_prompt);
//! # Ok(())
//! # }
//! ```
//!
//! The client performs no retries. Use [`ApiError::is_retryable`] to build a
//! caller-side policy if one is wanted.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod transport;

// Re-export main client
pub use client::{PromptliftClient, PromptliftClientBuilder};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ApiError, ApiResult};

pub use api::{HealthStatus, KeyStatus};
