//! Decode errors for inbound AO messages
//!
//! Every variant renders as the human-readable reason placed in the `Data`
//! field of the `Error` response the dispatcher sends back.

use thiserror::Error;

/// Reasons an inbound message could not be turned into a [`crate::Message`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Envelope parsed but carried no `Action` (neither top-level nor tag)
    #[error("Action is required")]
    MissingAction { from: Option<String> },

    /// Envelope is not valid JSON or a field has an unsupported shape
    #[error("Malformed message: {reason}")]
    Malformed {
        reason: String,
        from: Option<String>,
    },

    /// Raw message exceeds the configured inbound bound
    #[error("Message too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    /// Flattened tag pair without `=` while strict tag decoding is enabled
    #[error("Malformed tag pair '{pair}': expected key=value")]
    MalformedTag { pair: String, from: Option<String> },
}

impl DecodeError {
    /// Create a malformed-message error
    pub fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::Malformed {
            reason: reason.into(),
            from: None,
        }
    }

    /// Attach the sender recovered from a partially readable envelope
    pub fn with_sender(self, sender: Option<String>) -> Self {
        match self {
            DecodeError::Malformed { reason, .. } => DecodeError::Malformed {
                reason,
                from: sender,
            },
            other => other,
        }
    }

    /// Create a size-limit error
    pub fn too_large(size: usize, limit: usize) -> Self {
        DecodeError::TooLarge { size, limit }
    }

    /// Sender of the offending message, when it could be recovered
    pub fn sender(&self) -> Option<&str> {
        match self {
            DecodeError::MissingAction { from }
            | DecodeError::MalformedTag { from, .. }
            | DecodeError::Malformed { from, .. } => from.as_deref(),
            DecodeError::TooLarge { .. } => None,
        }
    }
}
