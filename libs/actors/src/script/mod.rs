//! Embedded Interpreter Adapter
//!
//! Script processes hand every decoded message to a global entry point
//! function (default `handle`) defined by a user script. The interpreter is
//! created during `init`, dropped on teardown, and dropped on any `init`
//! failure, so a half-loaded script never lingers.
//!
//! ## Message table
//!
//! Each present field of the message becomes a string entry of one table
//! (`Id`, `From`, `Owner`, `Target`, `Anchor`, `Data`, `Timestamp`,
//! `Block-Height`, `Hash-Chain`, `Action`, `Key`, `Value`) plus a nested
//! `Tags` table, always present.
//!
//! ## Return values
//!
//! | Returned        | Response                                     |
//! |-----------------|----------------------------------------------|
//! | string          | sent verbatim                                |
//! | table           | encoded as JSON                              |
//! | number, boolean | JSON scalar text                             |
//! | `nil`           | `Error`: `No response from handle function`  |
//!
//! The Lua backend lives behind the default `lua` feature.

use crate::error::ProcessError;
use ao_config::{defaults, ScriptSettings};
use std::path::PathBuf;

#[cfg(feature = "lua")]
mod lua;

#[cfg(feature = "lua")]
pub use lua::ScriptHandler;

/// Scripts above this size are refused at load time
pub const MAX_SCRIPT_BYTES: usize = 512 * 1024;

/// Fault text when the entry point returns nothing
pub const NO_RESPONSE: &str = "No response from handle function";

/// Where a script's source comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    File(PathBuf),
    Inline { name: String, code: String },
}

impl ScriptSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        ScriptSource::File(path.into())
    }

    pub fn inline(name: impl Into<String>, code: impl Into<String>) -> Self {
        ScriptSource::Inline {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Chunk name shown in interpreter error messages
    pub fn name(&self) -> String {
        match self {
            ScriptSource::File(path) => path.display().to_string(),
            ScriptSource::Inline { name, .. } => name.clone(),
        }
    }

    /// Read the source text, enforcing [`MAX_SCRIPT_BYTES`]
    pub fn read(&self) -> Result<String, ProcessError> {
        let code = match self {
            ScriptSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| ProcessError::script_load(self.name(), e.to_string()))?,
            ScriptSource::Inline { code, .. } => code.clone(),
        };

        if code.len() > MAX_SCRIPT_BYTES {
            return Err(ProcessError::script_load(
                self.name(),
                format!(
                    "script is {} bytes, exceeds limit of {} bytes",
                    code.len(),
                    MAX_SCRIPT_BYTES
                ),
            ));
        }
        Ok(code)
    }
}

/// Interpreter settings independent of the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOptions {
    pub entry_point: String,
    /// Interpreter heap limit; `None` leaves it unbounded
    pub memory_limit_bytes: Option<usize>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            entry_point: defaults::ENTRY_POINT.to_string(),
            memory_limit_bytes: Some(defaults::SCRIPT_MEMORY_LIMIT_BYTES),
        }
    }
}

impl From<&ScriptSettings> for ScriptOptions {
    fn from(settings: &ScriptSettings) -> Self {
        Self {
            entry_point: settings.entry_point.clone(),
            memory_limit_bytes: settings.memory_limit_bytes,
        }
    }
}
