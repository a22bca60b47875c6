//! Process error taxonomy
//!
//! Three tiers, matching how far a failure is allowed to travel:
//!
//! - [`ApplicationError`]: expected, user-facing conditions (missing field,
//!   unknown action, full store). Always rendered as an `Error` response.
//! - [`HandlerError`]: what a handler hands back to the dispatcher. Faults and
//!   missing entry points are also rendered as `Error` responses, but are
//!   counted and logged separately.
//! - [`ProcessError`]: infrastructure failures returned to the caller of
//!   `init`/`dispatch`. These mean the process itself is unusable.
//!
//! [`EvalError`] is the separate surface of the `eval` capability.

use crate::process::Lifecycle;
use crate::registry::HandlerKind;
use thiserror::Error;

/// State store rejections
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("State store is full (capacity {capacity}); cannot add key '{key}'")]
    CapacityExceeded { key: String, capacity: usize },

    #[error("Key must not be empty")]
    EmptyKey,

    #[error("Key too long: {len} bytes exceeds limit of {limit} bytes")]
    KeyTooLong { len: usize, limit: usize },

    #[error("Value too long: {len} bytes exceeds limit of {limit} bytes")]
    ValueTooLong { len: usize, limit: usize },

    #[error("Invalid key format '{key}': use alphanumeric characters, underscores and hyphens only")]
    InvalidKeyFormat { key: String },
}

/// Conditions a handler reports as ordinary data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    /// A field the action needs was absent
    #[error("{0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Unknown action: {action}. Available actions: {available}")]
    UnknownAction { action: String, available: String },

    /// Free-form rejection raised by a user function handler
    #[error("{0}")]
    Rejected(String),
}

impl ApplicationError {
    /// Create an unknown-action error listing the recognized set
    pub fn unknown_action(action: impl Into<String>, available: &[&str]) -> Self {
        ApplicationError::UnknownAction {
            action: action.into(),
            available: available.join(", "),
        }
    }

    /// Create a rejection for function handlers
    pub fn rejected(reason: impl Into<String>) -> Self {
        ApplicationError::Rejected(reason.into())
    }
}

/// Failure returned by a [`crate::MessageHandler`] for one message
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error(transparent)]
    Application(#[from] ApplicationError),

    /// Handler or interpreter raised during invocation
    #[error("Handler fault: {0}")]
    Fault(String),

    /// The registered entry point is not defined or not callable
    #[error("Handler function '{entry_point}' not found")]
    Missing { entry_point: String },
}

impl HandlerError {
    pub fn fault(reason: impl Into<String>) -> Self {
        HandlerError::Fault(reason.into())
    }
}

/// Infrastructure failures surfaced to the integrator
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Process is not initialized (state: {state})")]
    NotInitialized { state: Lifecycle },

    #[error("Process is already initialized")]
    AlreadyInitialized,

    #[error("Process has been shut down")]
    ShutDown,

    #[error("Failed to load script {name}: {reason}")]
    ScriptLoad { name: String, reason: String },

    #[error("Interpreter error: {0}")]
    Interpreter(String),

    #[error("Encoding error: {0}")]
    Encode(String),
}

impl ProcessError {
    pub fn script_load(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ProcessError::ScriptLoad {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Failures of the `eval` capability
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("Process is not initialized (state: {state})")]
    NotInitialized { state: Lifecycle },

    #[error("Eval is not supported by the {kind} handler")]
    Unsupported { kind: HandlerKind },

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Failed to encode eval result: {0}")]
    Encode(String),
}
