//! # AO Process Configuration
//!
//! Centralized configuration and defaults for AO processes and the host
//! binary that drives them.
//!
//! ## Sources
//!
//! Configuration is layered, later sources winning:
//!
//! 1. Built-in defaults ([`ProcessConfig::default`])
//! 2. A TOML file
//! 3. Environment variables with the `AO_` prefix, `__` between sections
//!    (`AO_STORE__CAPACITY=10`, `AO_LOGGING__LEVEL=debug`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ao_config::ProcessConfig;
//! use std::path::Path;
//!
//! let config = ProcessConfig::load(Some(Path::new("config/process.toml")))?;
//! println!("store capacity: {:?}", config.store.capacity);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod defaults;
pub mod process_config;

// Re-export commonly used types
pub use process_config::{
    DecodeSettings, LoggingSettings, ProcessConfig, ProcessSettings, ScriptSettings,
    StoreSettings,
};
