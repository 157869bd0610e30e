//! Config file loading and validation.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// JSON key holding the DashScope API key.
pub const API_KEY_FIELD: &str = "DASHSCOPE_API_KEY";

/// Model used when the config file does not name one.
pub const DEFAULT_MODEL: &str = "qwen-image-max";

/// Prefix DashScope API keys normally start with.
const API_KEY_PREFIX: &str = "sk-";

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "DASHSCOPE_API_KEY")]
    api_key: Option<String>,
    #[serde(rename = "MODEL")]
    model: Option<String>,
}

impl RawConfig {
    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(e),
        })?;

        serde_json::from_str(&text).map_err(|source| Error::ConfigMalformed {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Loaded configuration. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Config {
    api_key: String,
    model: Option<String>,
}

impl Config {
    /// Checks that the config file is readable and carries the API key.
    ///
    /// A key without the usual `sk-` prefix only produces a warning.
    pub fn validate(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let api_key = Self::require_api_key(path, RawConfig::read(path)?)?.api_key;

        if !looks_like_api_key(&api_key) {
            tracing::warn!(
                "API key usually starts with '{API_KEY_PREFIX}', please double-check {API_KEY_FIELD}"
            );
        }
        Ok(())
    }

    /// Loads the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::require_api_key(path, RawConfig::read(path)?)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    fn require_api_key(path: &Path, raw: RawConfig) -> Result<Self> {
        let api_key = raw.api_key.ok_or_else(|| Error::ConfigMissingField {
            path: path.to_path_buf(),
            field: API_KEY_FIELD,
        })?;
        Ok(Self {
            api_key,
            model: raw.model,
        })
    }

    /// Returns the API key used as bearer credential.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the configured model, or [`DEFAULT_MODEL`].
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Returns true if `key` has the shape of a DashScope API key.
pub fn looks_like_api_key(key: &str) -> bool {
    key.starts_with(API_KEY_PREFIX)
}
