//! Closure-backed handler
//!
//! The closure receives every decoded message regardless of action and runs
//! inside a store transaction: returning `Err` or panicking rolls back every
//! write it made during that call.

use crate::error::{ApplicationError, HandlerError};
use crate::registry::{HandlerKind, MessageHandler, Reply};
use crate::store::StateStore;
use ao_types::{Message, Response};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

pub struct FunctionHandler<F> {
    function: F,
}

impl<F> FunctionHandler<F>
where
    F: FnMut(&Message, &mut StateStore) -> Result<Response, ApplicationError>,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> MessageHandler for FunctionHandler<F>
where
    F: FnMut(&Message, &mut StateStore) -> Result<Response, ApplicationError>,
{
    fn kind(&self) -> HandlerKind {
        HandlerKind::Function
    }

    fn handle(&mut self, message: &Message, store: &mut StateStore) -> Result<Reply, HandlerError> {
        let function = &mut self.function;
        store.transaction(|store| {
            match panic::catch_unwind(AssertUnwindSafe(|| function(message, store))) {
                Ok(Ok(response)) => Ok(Reply::Envelope(response)),
                Ok(Err(error)) => Err(HandlerError::Application(error)),
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    warn!(action = %message.action, %reason, "Function handler panicked");
                    Err(HandlerError::Fault(reason))
                }
            }
        })
    }
}

/// Text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "handler panicked".to_string()
    }
}
