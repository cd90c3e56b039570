//! Configuration management for IDLens.
//!
//! Settings are built once at startup and passed by reference into the
//! service and client layers. Precedence, lowest to highest: compiled
//! defaults, optional TOML file, environment (via clap `env` attrs on
//! the CLI flags), command line flags.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::llm::LlmConfig;

/// Default config filename looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "idlens.toml";

fn default_workers() -> usize {
    4
}

/// Process-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Vision model endpoint configuration.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Number of concurrent per-image pipelines.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            workers: default_workers(),
        }
    }
}

/// Load settings from an explicit config file, or from
/// `idlens.toml` in the working directory if present, or defaults.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                return Ok(Settings::default());
            }
            default.to_path_buf()
        }
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}
