//! # AO Process Runtime
//!
//! Embeddable actor message-handling runtime. A [`Process`] owns a
//! [`StateStore`], one active [`MessageHandler`] and a [`Dispatcher`] that
//! turns each raw inbound message into exactly one encoded response.
//!
//! ## Architecture
//!
//! ```text
//! raw message ─► Dispatcher ─► decode ─► Message
//!                                          │
//!                        ┌─────────────────┼──────────────────┐
//!                        ▼                 ▼                  ▼
//!                 KeyValueHandler   FunctionHandler     ScriptHandler
//!                 (Info/Set/Get/    (user closure,      (Lua entry point,
//!                  List)             transactional)      feature `lua`)
//!                        └─────────────────┼──────────────────┘
//!                                          ▼
//!                          Response / raw reply ─► encode ─► wire
//! ```
//!
//! Application conditions (missing key, unknown action, full store) and
//! handler faults come back as `Error` responses. Only infrastructure
//! failures, such as dispatching before `init`, are returned as
//! [`ProcessError`].
//!
//! ## Example
//!
//! ```rust
//! use ao_actors::Process;
//! use ao_config::ProcessConfig;
//!
//! let mut process = Process::native(&ProcessConfig::default());
//! process.init()?;
//!
//! let reply = process.dispatch(r#"{"Action":"Set","Key":"name","Value":"Alice","From":"bob"}"#)?;
//! assert!(reply.contains("Successfully set name to Alice"));
//!
//! let reply = process.dispatch(r#"{"Action":"Get","Key":"name","From":"bob"}"#)?;
//! assert_eq!(reply, r#"{"Target":"bob","Action":"Get-Response","Key":"name","Data":"Alice"}"#);
//!
//! process.teardown();
//! # Ok::<(), ao_actors::ProcessError>(())
//! ```

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod process;
pub mod registry;
pub mod script;
pub mod store;

pub use dispatcher::{Dispatched, Dispatcher, Outcome, FALLBACK_ERROR};
pub use error::{ApplicationError, EvalError, HandlerError, ProcessError, StoreError};
pub use handlers::{FunctionHandler, KeyValueHandler, NATIVE_ACTIONS};
pub use process::{DispatchStats, HandlerSetup, Lifecycle, Process};
pub use registry::{HandlerKind, HandlerRegistry, MessageHandler, ProcessId, Reply};
pub use script::{ScriptOptions, ScriptSource};
pub use store::{StateStore, StoreLimits};

#[cfg(feature = "lua")]
pub use script::ScriptHandler;
