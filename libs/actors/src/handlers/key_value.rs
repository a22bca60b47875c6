//! Native key/value handler
//!
//! | Action | Needs        | Success reply                                   |
//! |--------|--------------|-------------------------------------------------|
//! | `Info` |              | `Hello from <name>! State entries: <n>`         |
//! | `Set`  | `Key`,`Value`| `Successfully set <key> to <value>` with `Key`  |
//! | `Get`  | `Key`        | stored value, or `Not found`, with `Key`        |
//! | `List` |              | object of every entry, `{}` when empty          |
//!
//! Anything else is an unknown action. Failures never touch the store.

use crate::error::{ApplicationError, HandlerError};
use crate::registry::{HandlerKind, MessageHandler, Reply};
use crate::store::StateStore;
use ao_types::{Message, Response};
use tracing::debug;

/// Actions recognized by [`KeyValueHandler`], in the order they are advertised
pub const NATIVE_ACTIONS: [&str; 4] = ["Info", "Set", "Get", "List"];

/// `Data` of a `Get-Response` for an absent key
pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone)]
pub struct KeyValueHandler {
    name: String,
}

impl KeyValueHandler {
    /// `name` appears in `Info` replies
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn info(&self, message: &Message, store: &StateStore) -> Response {
        Response::reply(message.sender(), &message.action).with_data(format!(
            "Hello from {}! State entries: {}",
            self.name,
            store.len()
        ))
    }

    fn set(message: &Message, store: &mut StateStore) -> Result<Response, ApplicationError> {
        let (Some(key), Some(value)) = (message.key.as_deref(), message.value.as_deref()) else {
            return Err(ApplicationError::MissingField("Key and value are required"));
        };

        store.set(key, value)?;
        debug!(key, "Stored value");

        Ok(Response::reply(message.sender(), &message.action)
            .with_key(key)
            .with_data(format!("Successfully set {} to {}", key, value)))
    }

    fn get(message: &Message, store: &StateStore) -> Result<Response, ApplicationError> {
        let key = message
            .key
            .as_deref()
            .ok_or(ApplicationError::MissingField("Key is required"))?;

        Ok(Response::reply(message.sender(), &message.action)
            .with_key(key)
            .with_data(store.get(key).unwrap_or(NOT_FOUND)))
    }

    fn list(message: &Message, store: &StateStore) -> Response {
        Response::reply(message.sender(), &message.action).with_entries(store.entries().clone())
    }
}

impl Default for KeyValueHandler {
    fn default() -> Self {
        Self::new(ao_config::defaults::PROCESS_NAME)
    }
}

impl MessageHandler for KeyValueHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Native
    }

    fn handle(&mut self, message: &Message, store: &mut StateStore) -> Result<Reply, HandlerError> {
        let response = match message.action.as_str() {
            "Info" => self.info(message, store),
            "Set" => Self::set(message, store)?,
            "Get" => Self::get(message, store)?,
            "List" => Self::list(message, store),
            other => return Err(ApplicationError::unknown_action(other, &NATIVE_ACTIONS).into()),
        };
        Ok(Reply::Envelope(response))
    }
}
