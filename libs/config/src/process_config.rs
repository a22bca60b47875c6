//! Process Configuration Module
//!
//! Provides configuration loading for AO processes. Supports loading from TOML
//! files with `AO_`-prefixed environment overrides.

use crate::defaults;
use anyhow::{ensure, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main process configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Process-wide settings
    pub process: ProcessSettings,

    /// State store bounds
    pub store: StoreSettings,

    /// Inbound decoding policy
    pub decode: DecodeSettings,

    /// Script handler; absent for native key/value processes
    pub script: Option<ScriptSettings>,

    /// Log output
    pub logging: LoggingSettings,
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessSettings {
    pub name: String,
    pub max_message_bytes: usize,
    pub max_response_bytes: usize,
}

/// State store bounds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Maximum number of distinct keys; `None` for an unbounded store
    pub capacity: Option<usize>,
    pub max_key_len: Option<usize>,
    pub max_value_len: Option<usize>,
    /// Restrict keys to ASCII alphanumerics, `_` and `-`
    pub strict_keys: bool,
}

/// Inbound decoding policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecodeSettings {
    /// Reject flattened tag pairs lacking `=` instead of dropping them
    pub strict_tags: bool,
}

/// Script handler settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScriptSettings {
    pub path: PathBuf,

    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    #[serde(default = "default_memory_limit")]
    pub memory_limit_bytes: Option<usize>,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

fn default_entry_point() -> String {
    defaults::ENTRY_POINT.to_string()
}

fn default_memory_limit() -> Option<usize> {
    Some(defaults::SCRIPT_MEMORY_LIMIT_BYTES)
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            name: defaults::PROCESS_NAME.to_string(),
            max_message_bytes: defaults::MAX_MESSAGE_BYTES,
            max_response_bytes: defaults::MAX_RESPONSE_BYTES,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            capacity: None,
            max_key_len: Some(defaults::MAX_KEY_LEN),
            max_value_len: Some(defaults::MAX_VALUE_LEN),
            strict_keys: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl ScriptSettings {
    /// Script settings for `path` with default entry point and memory limit
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entry_point: default_entry_point(),
            memory_limit_bytes: default_memory_limit(),
        }
    }
}

impl ProcessConfig {
    /// Load configuration from an optional file with `AO_` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(path, defaults::ENV_PREFIX)
    }

    /// Load configuration using a custom environment prefix
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading process config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator(defaults::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let mut config: ProcessConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.expand_env_vars()?;
        config.validate()?;
        debug!(?config, "Process configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment overrides)
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: ProcessConfig =
            toml::from_str(contents).context("Failed to parse configuration")?;
        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot honor
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.process.max_message_bytes > 0,
            "process.max_message_bytes must be > 0"
        );
        ensure!(
            self.process.max_response_bytes > 0,
            "process.max_response_bytes must be > 0"
        );
        ensure!(self.store.capacity != Some(0), "store.capacity must be > 0");
        ensure!(self.store.max_key_len != Some(0), "store.max_key_len must be > 0");
        ensure!(
            self.store.max_value_len != Some(0),
            "store.max_value_len must be > 0"
        );

        if let Some(script) = &self.script {
            ensure!(
                !script.entry_point.trim().is_empty(),
                "script.entry_point must not be empty"
            );
            ensure!(
                script.memory_limit_bytes != Some(0),
                "script.memory_limit_bytes must be > 0"
            );
        }

        Ok(())
    }

    /// Expand `~` and `${VAR}` in the script path
    pub fn expand_env_vars(&mut self) -> Result<()> {
        if let Some(script) = &mut self.script {
            let raw = script.path.to_string_lossy().to_string();
            let expanded = shellexpand::full(&raw).context("Failed to expand script path")?;
            script.path = PathBuf::from(expanded.as_ref());
        }
        Ok(())
    }

    /// Whether messages go to a script rather than the native key/value handler
    pub fn is_script_process(&self) -> bool {
        self.script.is_some()
    }
}
