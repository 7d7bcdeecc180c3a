// Core types and local persistence for the Promptlift bridge

pub mod config;
pub mod credential;
pub mod types;

pub use config::{ConfigError, ConfigStore, ConfigUpdate, StoredConfig};
pub use credential::{ApiKey, KeyFormatError};
pub use types::*;
