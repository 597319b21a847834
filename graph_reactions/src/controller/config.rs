//! Runtime configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Switches for what [`GraphController::execute`](crate::GraphController::execute) does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Run the orphan sweep after binding.
    pub sweep_on_execute: bool,

    /// Bind controller variables to the instance's.
    pub bind_variables: bool,

    /// Enter the root state machine.
    pub enter_on_execute: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sweep_on_execute: true,
            bind_variables: true,
            enter_on_execute: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Errors loading a [`RuntimeConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
