//! Handler Registry
//!
//! Holds the single active handler of a process. A handler is anything that
//! maps a decoded [`Message`] to one reply: the native key/value handler, a
//! registered closure, or a script entry point behind the interpreter adapter.

use crate::error::{EvalError, HandlerError, ProcessError};
use crate::store::StateStore;
use ao_types::{Message, Response};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Unique process identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId {
    id: Uuid,
}

impl ProcessId {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self { id }
    }

    pub fn uuid(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process-{}", self.id.simple())
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

/// Which flavor of handler is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Native,
    Function,
    Script,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKind::Native => write!(f, "native"),
            HandlerKind::Function => write!(f, "function"),
            HandlerKind::Script => write!(f, "script"),
        }
    }
}

/// Successful handler output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Structured response, encoded by the dispatcher
    Envelope(Response),
    /// Already-encoded text returned verbatim (script handlers)
    Raw(String),
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Envelope(response)
    }
}

/// Logic that answers messages on behalf of a process
///
/// Handlers run synchronously, one message at a time, with exclusive access
/// to the process state store.
pub trait MessageHandler {
    fn kind(&self) -> HandlerKind;

    /// Produce the reply for one decoded message
    fn handle(&mut self, message: &Message, store: &mut StateStore) -> Result<Reply, HandlerError>;

    /// Evaluate arbitrary code; only interpreter-backed handlers support this
    fn eval(&mut self, _code: &str) -> Result<String, EvalError> {
        Err(EvalError::Unsupported { kind: self.kind() })
    }

    /// Diagnostic snapshot of the handler's view of process state
    fn inspect(&self, store: &StateStore) -> Result<serde_json::Value, ProcessError> {
        Ok(store.to_json())
    }

    /// Release resources before the handler is dropped
    fn shutdown(&mut self) {}
}

/// Slot for the one active handler
#[derive(Default)]
pub struct HandlerRegistry {
    active: Option<Box<dyn MessageHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler`, shutting down any previous one
    pub fn install(&mut self, handler: Box<dyn MessageHandler>) {
        debug!(kind = %handler.kind(), "Installing handler");
        self.clear();
        self.active = Some(handler);
    }

    pub fn is_installed(&self) -> bool {
        self.active.is_some()
    }

    pub fn kind(&self) -> Option<HandlerKind> {
        self.active.as_ref().map(|h| h.kind())
    }

    pub fn active(&self) -> Option<&dyn MessageHandler> {
        self.active.as_deref()
    }

    pub fn active_mut(&mut self) -> Option<&mut (dyn MessageHandler + 'static)> {
        self.active.as_deref_mut()
    }

    /// Shut down and drop the active handler
    pub fn clear(&mut self) {
        if let Some(mut handler) = self.active.take() {
            debug!(kind = %handler.kind(), "Releasing handler");
            handler.shutdown();
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("active", &self.kind())
            .finish()
    }
}
