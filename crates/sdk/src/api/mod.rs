//! API endpoint groups.

mod health;
mod keys;
mod prompts;

pub use health::{HealthApi, HealthStatus};
pub use keys::{KeyStatus, KeysApi};
pub use prompts::{encode_request, PromptsApi, INPUT_PARAM};
