//! Router Configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::store::DEFAULT_MANIFEST_FILE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// When queries look at the authoritative manifest again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshPolicy {
    /// Re-read the manifest before every query and rebuild if it changed.
    #[default]
    EveryQuery,
    /// Serve the published snapshot until `reload` is called.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouterConfig {
    /// Host part of every `content://` URI the router answers.
    #[serde(default = "default_authority")]
    pub authority: String,
    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,
    #[serde(default)]
    pub refresh: RefreshPolicy,
    /// Fail the whole reload when any pack is rejected.
    #[serde(default)]
    pub strict: bool,
}

fn default_authority() -> String { "stickerpack.provider".to_string() }
fn default_manifest_file() -> String { DEFAULT_MANIFEST_FILE.to_string() }

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            authority: default_authority(),
            manifest_file: default_manifest_file(),
            refresh: RefreshPolicy::default(),
            strict: false,
        }
    }
}

impl RouterConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
