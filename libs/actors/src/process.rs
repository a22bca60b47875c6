//! Process lifecycle
//!
//! A [`Process`] combines one [`StateStore`], one [`HandlerRegistry`] slot and
//! a [`Dispatcher`]. It moves through
//!
//! ```text
//! Uninitialized --init--> Ready --teardown--> ShutDown
//!                          |  ^
//!                 dispatch |  | response
//!                          v  |
//!                       (dispatching)
//! ```
//!
//! Dispatching takes `&mut self`, so one message is handled to completion
//! before the next can start. `dispatch` outside `Ready` fails fast with
//! [`ProcessError::NotInitialized`] without decoding anything.

use crate::dispatcher::{Dispatched, Dispatcher, Outcome};
use crate::error::{ApplicationError, EvalError, ProcessError};
use crate::handlers::{FunctionHandler, KeyValueHandler};
use crate::registry::{HandlerKind, HandlerRegistry, MessageHandler, ProcessId};
use crate::script::{ScriptOptions, ScriptSource};
use crate::store::{StateStore, StoreLimits};
use ao_config::ProcessConfig;
use ao_types::{DecodeOptions, Message, Response};
use std::fmt;
use tracing::{info, info_span, warn};

/// Lifecycle state of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    ShutDown,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Uninitialized => write!(f, "uninitialized"),
            Lifecycle::Ready => write!(f, "ready"),
            Lifecycle::ShutDown => write!(f, "shut down"),
        }
    }
}

/// Handler installed by [`Process::init`]
pub enum HandlerSetup {
    /// Native `Info`/`Set`/`Get`/`List`
    KeyValue,
    /// Any handler built by the integrator
    Custom(Box<dyn MessageHandler>),
    /// Script loaded into the embedded interpreter
    Script {
        source: ScriptSource,
        options: ScriptOptions,
    },
}

impl HandlerSetup {
    /// Wrap a closure as a [`FunctionHandler`]
    pub fn function<F>(function: F) -> Self
    where
        F: FnMut(&Message, &mut StateStore) -> Result<Response, ApplicationError> + 'static,
    {
        HandlerSetup::Custom(Box::new(FunctionHandler::new(function)))
    }

    pub fn script(source: ScriptSource, options: ScriptOptions) -> Self {
        HandlerSetup::Script { source, options }
    }
}

impl fmt::Debug for HandlerSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSetup::KeyValue => write!(f, "KeyValue"),
            HandlerSetup::Custom(handler) => write!(f, "Custom({})", handler.kind()),
            HandlerSetup::Script { source, options } => f
                .debug_struct("Script")
                .field("source", &source.name())
                .field("entry_point", &options.entry_point)
                .finish(),
        }
    }
}

/// Dispatch counters, reset only by creating a new process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub succeeded: u64,
    pub application_errors: u64,
    pub decode_failures: u64,
    /// Faults, missing entry points and oversized responses
    pub handler_faults: u64,
}

impl DispatchStats {
    pub fn record(&mut self, outcome: Outcome) {
        self.dispatched += 1;
        match outcome {
            Outcome::Success => self.succeeded += 1,
            Outcome::ApplicationError => self.application_errors += 1,
            Outcome::DecodeFailure => self.decode_failures += 1,
            Outcome::HandlerFault | Outcome::HandlerMissing | Outcome::ResponseTooLarge => {
                self.handler_faults += 1
            }
        }
    }
}

/// Long-lived unit owning state and a handler
pub struct Process {
    id: ProcessId,
    name: String,
    lifecycle: Lifecycle,
    store: StateStore,
    registry: HandlerRegistry,
    pending: Option<HandlerSetup>,
    dispatcher: Dispatcher,
    stats: DispatchStats,
}

impl Process {
    pub fn new(config: &ProcessConfig, setup: HandlerSetup) -> Self {
        let decode = DecodeOptions {
            max_message_bytes: config.process.max_message_bytes,
            strict_tags: config.decode.strict_tags,
        };

        Self {
            id: ProcessId::new(),
            name: config.process.name.clone(),
            lifecycle: Lifecycle::Uninitialized,
            store: StateStore::new(StoreLimits::from(&config.store)),
            registry: HandlerRegistry::new(),
            pending: Some(setup),
            dispatcher: Dispatcher::new(decode, config.process.max_response_bytes),
            stats: DispatchStats::default(),
        }
    }

    /// Script process when `[script]` is configured, native key/value otherwise
    pub fn from_config(config: &ProcessConfig) -> Self {
        let setup = match &config.script {
            Some(script) => HandlerSetup::script(
                ScriptSource::file(script.path.clone()),
                ScriptOptions::from(script),
            ),
            None => HandlerSetup::KeyValue,
        };
        Self::new(config, setup)
    }

    pub fn native(config: &ProcessConfig) -> Self {
        Self::new(config, HandlerSetup::KeyValue)
    }

    pub fn with_function<F>(config: &ProcessConfig, function: F) -> Self
    where
        F: FnMut(&Message, &mut StateStore) -> Result<Response, ApplicationError> + 'static,
    {
        Self::new(config, HandlerSetup::function(function))
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Read-only view of the state store
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn handler_kind(&self) -> Option<HandlerKind> {
        self.registry.kind()
    }

    /// Reset the store and install the handler
    ///
    /// A failed script load leaves the process `Uninitialized` with no
    /// interpreter allocated; `init` may be retried.
    pub fn init(&mut self) -> Result<(), ProcessError> {
        let span = info_span!("process", id = %self.id);
        let _enter = span.enter();

        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Ready => return Err(ProcessError::AlreadyInitialized),
            Lifecycle::ShutDown => return Err(ProcessError::ShutDown),
        }

        let handler: Box<dyn MessageHandler> = match self.pending.take() {
            Some(HandlerSetup::KeyValue) => Box::new(KeyValueHandler::new(self.name.as_str())),
            Some(HandlerSetup::Custom(handler)) => handler,
            Some(HandlerSetup::Script { source, options }) => match load_script(&source, &options) {
                Ok(handler) => handler,
                Err(e) => {
                    warn!(error = %e, "Process initialization failed");
                    self.pending = Some(HandlerSetup::Script { source, options });
                    return Err(e);
                }
            },
            None => return Err(ProcessError::Interpreter("no handler to install".to_string())),
        };

        self.store.reset();
        self.registry.install(handler);
        self.lifecycle = Lifecycle::Ready;

        info!(
            name = %self.name,
            handler = ?self.registry.kind(),
            capacity = ?self.store.limits().capacity,
            "Process initialized"
        );
        Ok(())
    }

    /// Handle one raw message, returning the encoded response
    pub fn dispatch(&mut self, raw: &str) -> Result<String, ProcessError> {
        self.dispatch_detailed(raw).map(|dispatched| dispatched.wire)
    }

    /// Like [`Process::dispatch`], also reporting which path produced the response
    pub fn dispatch_detailed(&mut self, raw: &str) -> Result<Dispatched, ProcessError> {
        self.dispatch_bytes(raw.as_bytes())
    }

    /// Like [`Process::dispatch_detailed`] for input not yet known to be UTF-8
    pub fn dispatch_bytes(&mut self, raw: &[u8]) -> Result<Dispatched, ProcessError> {
        let span = info_span!("process", id = %self.id);
        let _enter = span.enter();

        self.ensure_ready()?;
        let handler = self
            .registry
            .active_mut()
            .ok_or(ProcessError::NotInitialized {
                state: self.lifecycle,
            })?;

        let dispatched = self.dispatcher.dispatch_bytes(raw, &mut self.store, handler);
        self.stats.record(dispatched.outcome);
        Ok(dispatched)
    }

    /// Evaluate code in the handler's interpreter
    pub fn eval(&mut self, code: &str) -> Result<String, EvalError> {
        let span = info_span!("process", id = %self.id);
        let _enter = span.enter();

        let state = self.lifecycle;
        let handler = match (state, self.registry.active_mut()) {
            (Lifecycle::Ready, Some(handler)) => handler,
            _ => return Err(EvalError::NotInitialized { state }),
        };

        let result = handler.eval(code);
        if let Err(e) = &result {
            warn!(error = %e, "Eval failed");
        }
        result
    }

    /// JSON snapshot of process state for diagnostics
    pub fn inspect_state(&self) -> Result<String, ProcessError> {
        self.ensure_ready()?;
        let handler = self.registry.active().ok_or(ProcessError::NotInitialized {
            state: self.lifecycle,
        })?;
        let snapshot = handler.inspect(&self.store)?;
        serde_json::to_string(&snapshot).map_err(|e| ProcessError::Encode(e.to_string()))
    }

    /// Release the handler and any interpreter; idempotent
    pub fn teardown(&mut self) {
        if self.lifecycle == Lifecycle::ShutDown {
            return;
        }

        let span = info_span!("process", id = %self.id);
        let _enter = span.enter();

        self.registry.clear();
        self.pending = None;
        self.lifecycle = Lifecycle::ShutDown;

        info!(
            dispatched = self.stats.dispatched,
            application_errors = self.stats.application_errors,
            decode_failures = self.stats.decode_failures,
            handler_faults = self.stats.handler_faults,
            "Process shut down"
        );
    }

    fn ensure_ready(&self) -> Result<(), ProcessError> {
        match self.lifecycle {
            Lifecycle::Ready => Ok(()),
            state => Err(ProcessError::NotInitialized { state }),
        }
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if self.lifecycle == Lifecycle::Ready {
            self.teardown();
        }
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("lifecycle", &self.lifecycle)
            .field("handler", &self.registry.kind())
            .field("entries", &self.store.len())
            .finish()
    }
}

#[cfg(feature = "lua")]
fn load_script(
    source: &ScriptSource,
    options: &ScriptOptions,
) -> Result<Box<dyn MessageHandler>, ProcessError> {
    let handler = crate::script::ScriptHandler::load(source, options)?;
    Ok(Box::new(handler))
}

#[cfg(not(feature = "lua"))]
fn load_script(
    source: &ScriptSource,
    _options: &ScriptOptions,
) -> Result<Box<dyn MessageHandler>, ProcessError> {
    Err(ProcessError::script_load(
        source.name(),
        "scripting support is not compiled in (enable the `lua` feature)",
    ))
}
