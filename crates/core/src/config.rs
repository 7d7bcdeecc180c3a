//! Per-user persistence of the API key and backend address.
//!
//! The record lives at `~/.promptlift/config.json`. Only one bridge is
//! expected to run per user session, so the file is not locked; an
//! external edit racing with `save` can be lost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_DIR_NAME: &str = ".promptlift";
pub const CONFIG_FILE_NAME: &str = "config.json";

/// The persisted record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields to merge into the stored record. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub api_key: Option<String>,
    pub backend_url: Option<String>,
}

impl ConfigUpdate {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File-backed key/value store for the bridge configuration.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.promptlift/config.json`, if a home directory is known.
    pub fn default_location() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the stored record.
    ///
    /// Returns `None` when the file is missing, unreadable or corrupt. The
    /// latter two are logged, never raised.
    pub fn load(&self) -> Option<StoredConfig> {
        match self.try_load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to load stored configuration");
                None
            }
        }
    }

    /// Merge `update` into the stored record and stamp `updatedAt`.
    pub fn save(&self, update: ConfigUpdate) -> bool {
        match self.try_save(update) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save configuration");
                false
            }
        }
    }

    /// Remove the stored record. Succeeds if the record is gone afterwards.
    pub fn clear(&self) -> bool {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Configuration cleared");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "Failed to clear configuration");
                false
            }
        }
    }

    pub fn try_load(&self) -> Result<Option<StoredConfig>, ConfigError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(config))
    }

    pub fn try_save(&self, update: ConfigUpdate) -> Result<(), ConfigError> {
        // A corrupt record is replaced rather than blocking setup.
        let mut config = self.load().unwrap_or_default();
        if let Some(api_key) = update.api_key {
            config.api_key = Some(api_key);
        }
        if let Some(backend_url) = update.backend_url {
            config.backend_url = Some(backend_url);
        }
        config.updated_at = Some(Utc::now());

        let content = serde_json::to_string_pretty(&config)?;
        self.write_replacing(content.as_bytes())?;

        debug!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }

    /// Write to a sibling temp file, then rename over the record.
    fn write_replacing(&self, content: &[u8]) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        // A leftover temp file would keep its old permissions.
        match std::fs::remove_file(&tmp_path) {
            Ok(()) => debug!(path = %tmp_path.display(), "Removed stale temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(write_err(e)),
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let written = options.open(&tmp_path).and_then(|mut file| {
            file.write_all(content)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| std::fs::rename(&tmp_path, &self.path)) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(write_err(e));
        }
        Ok(())
    }
}
