//! Dispatcher
//!
//! Turns one raw inbound message into exactly one encoded response:
//!
//! 1. Decode. A failure returns an `Error` response addressed to the sender
//!    if it could be recovered, else `"unknown"`. The store is not touched.
//! 2. Invoke the active handler. Application errors, faults, panics and a
//!    missing entry point all become `Error` responses.
//! 3. Encode, replacing any response over the configured bound with an
//!    `Error` response naming the bound.
//!
//! Dispatch is total: given an installed handler it always yields a wire
//! string. The [`Outcome`] tells callers which path produced it.
//!
//! Panics are caught at two levels. [`crate::FunctionHandler`] guards its own
//! closure so it can roll back the store transaction before reporting a
//! fault; the guard here catches panics from every other handler kind
//! (custom native handlers, the key/value handler, interpreter glue) and
//! leaves the store as the handler left it.

use crate::error::HandlerError;
use crate::handlers::function::panic_message;
use crate::registry::{MessageHandler, Reply};
use crate::store::StateStore;
use ao_types::{decode_slice, DecodeOptions, Response, UNKNOWN_SENDER};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, warn};

/// Pre-encoded response used when even an error response cannot be serialized
pub const FALLBACK_ERROR: &str =
    r#"{"Target":"unknown","Action":"Error","Data":"Response serialization error"}"#;

/// Which path produced a dispatch result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ApplicationError,
    DecodeFailure,
    HandlerFault,
    HandlerMissing,
    ResponseTooLarge,
}

impl Outcome {
    /// Whether the wire response is an `Error` envelope produced by the runtime
    pub fn is_error(&self) -> bool {
        !matches!(self, Outcome::Success)
    }
}

/// One encoded response and how it came about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub wire: String,
    pub outcome: Outcome,
}

/// Decode/invoke/encode pipeline shared by every handler kind
#[derive(Debug, Clone)]
pub struct Dispatcher {
    decode: DecodeOptions,
    max_response_bytes: usize,
}

impl Dispatcher {
    pub fn new(decode: DecodeOptions, max_response_bytes: usize) -> Self {
        Self {
            decode,
            max_response_bytes,
        }
    }

    pub fn decode_options(&self) -> &DecodeOptions {
        &self.decode
    }

    pub fn max_response_bytes(&self) -> usize {
        self.max_response_bytes
    }

    pub fn dispatch(
        &self,
        raw: &str,
        store: &mut StateStore,
        handler: &mut dyn MessageHandler,
    ) -> Dispatched {
        self.dispatch_bytes(raw.as_bytes(), store, handler)
    }

    /// Dispatch raw input that has not been checked for UTF-8
    ///
    /// Invalid UTF-8 is a decode failure like any other malformed envelope.
    pub fn dispatch_bytes(
        &self,
        raw: &[u8],
        store: &mut StateStore,
        handler: &mut dyn MessageHandler,
    ) -> Dispatched {
        let message = match decode_slice(raw, &self.decode) {
            Ok(message) => message,
            Err(e) => {
                let target = e.sender().unwrap_or(UNKNOWN_SENDER).to_string();
                warn!(error = %e, target = %target, "Failed to decode message");
                let response = Response::error(target.as_str(), e.to_string());
                return self.encode(Reply::Envelope(response), Outcome::DecodeFailure, &target);
            }
        };

        let sender = message.sender().to_string();
        debug!(action = %message.action, from = %sender, "Dispatching message");

        let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&message, store)));

        let (reply, outcome) = match result {
            Ok(Ok(reply)) => (reply, Outcome::Success),
            Ok(Err(HandlerError::Application(e))) => {
                debug!(action = %message.action, error = %e, "Application error");
                (
                    Reply::Envelope(Response::error(sender.as_str(), e.to_string())),
                    Outcome::ApplicationError,
                )
            }
            Ok(Err(e @ HandlerError::Fault(_))) => {
                warn!(action = %message.action, error = %e, "Handler fault");
                (
                    Reply::Envelope(Response::error(sender.as_str(), e.to_string())),
                    Outcome::HandlerFault,
                )
            }
            Ok(Err(e @ HandlerError::Missing { .. })) => {
                warn!(action = %message.action, error = %e, "Handler entry point missing");
                (
                    Reply::Envelope(Response::error(sender.as_str(), e.to_string())),
                    Outcome::HandlerMissing,
                )
            }
            Err(payload) => {
                let fault = HandlerError::Fault(panic_message(payload.as_ref()));
                warn!(action = %message.action, error = %fault, "Handler panicked");
                (
                    Reply::Envelope(Response::error(sender.as_str(), fault.to_string())),
                    Outcome::HandlerFault,
                )
            }
        };

        self.encode(reply, outcome, &sender)
    }

    fn encode(&self, reply: Reply, outcome: Outcome, target: &str) -> Dispatched {
        let wire = match reply {
            Reply::Envelope(response) => encode_or_fallback(&response),
            Reply::Raw(text) => text,
        };

        if wire.len() > self.max_response_bytes {
            warn!(
                size = wire.len(),
                limit = self.max_response_bytes,
                "Response exceeds size bound"
            );
            let response = Response::error(
                target,
                format!(
                    "Response too large: {} bytes exceeds limit of {} bytes",
                    wire.len(),
                    self.max_response_bytes
                ),
            );
            return Dispatched {
                wire: encode_or_fallback(&response),
                outcome: Outcome::ResponseTooLarge,
            };
        }

        Dispatched { wire, outcome }
    }
}

fn encode_or_fallback(response: &Response) -> String {
    response.encode().unwrap_or_else(|e| {
        error!(error = %e, "Failed to encode response");
        FALLBACK_ERROR.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::KeyValueHandler;
    use crate::registry::HandlerKind;
    use ao_types::Message;
    use serde_json::Value;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(DecodeOptions::default(), 1024 * 1024)
    }

    fn parse(wire: &str) -> Value {
        serde_json::from_str(wire).unwrap()
    }

    #[test]
    fn test_decode_failure_is_addressed_to_unknown() {
        let mut store = StateStore::unbounded();
        let mut handler = KeyValueHandler::default();

        let out = dispatcher().dispatch("not json", &mut store, &mut handler);
        assert_eq!(out.outcome, Outcome::DecodeFailure);
        let value = parse(&out.wire);
        assert_eq!(value["Target"], "unknown");
        assert_eq!(value["Action"], "Error");
    }

    #[test]
    fn test_missing_action_is_addressed_to_sender() {
        let mut store = StateStore::unbounded();
        let mut handler = KeyValueHandler::default();

        let out = dispatcher().dispatch(r#"{"From":"alice","Key":"k"}"#, &mut store, &mut handler);
        let value = parse(&out.wire);
        assert_eq!(value["Target"], "alice");
        assert!(value["Data"].as_str().unwrap().contains("Action is required"));
    }

    #[test]
    fn test_malformed_field_is_addressed_to_sender() {
        let mut store = StateStore::unbounded();
        let mut handler = KeyValueHandler::default();

        let out = dispatcher().dispatch(
            r#"{"Action":"Info","From":"alice","Tags":{"n":1}}"#,
            &mut store,
            &mut handler,
        );
        assert_eq!(out.outcome, Outcome::DecodeFailure);
        let value = parse(&out.wire);
        assert_eq!(value["Target"], "alice");
        assert_eq!(value["Action"], "Error");
        assert!(value["Data"].as_str().unwrap().starts_with("Malformed message"));
    }

    #[test]
    fn test_application_error_becomes_error_response() {
        let mut store = StateStore::unbounded();
        let mut handler = KeyValueHandler::default();

        let out = dispatcher().dispatch(r#"{"Action":"Get","From":"bob"}"#, &mut store, &mut handler);
        assert_eq!(out.outcome, Outcome::ApplicationError);
        assert_eq!(
            out.wire,
            r#"{"Target":"bob","Action":"Error","Data":"Key is required"}"#
        );
    }

    #[test]
    fn test_invalid_utf8_is_a_decode_failure() {
        let mut store = StateStore::unbounded();
        let mut handler = KeyValueHandler::default();

        let out = dispatcher().dispatch_bytes(b"{\"Action\":\"Info\xff\"}", &mut store, &mut handler);
        assert_eq!(out.outcome, Outcome::DecodeFailure);
        let value = parse(&out.wire);
        assert_eq!(value["Action"], "Error");
        assert_eq!(value["Target"], "unknown");
    }

    #[test]
    fn test_oversized_response_is_replaced() {
        let mut store = StateStore::unbounded();
        store.set("big", "x".repeat(200)).unwrap();
        let mut handler = KeyValueHandler::default();
        let dispatcher = Dispatcher::new(DecodeOptions::default(), 128);

        let out = dispatcher.dispatch(r#"{"Action":"List"}"#, &mut store, &mut handler);
        assert_eq!(out.outcome, Outcome::ResponseTooLarge);
        let value = parse(&out.wire);
        assert_eq!(value["Action"], "Error");
        assert!(value["Data"].as_str().unwrap().contains("limit of 128 bytes"));
    }

    struct PanickingHandler;

    impl MessageHandler for PanickingHandler {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Native
        }

        fn handle(&mut self, _message: &Message, store: &mut StateStore) -> Result<Reply, HandlerError> {
            store.set("partial", "1").unwrap();
            panic!("native handler bug");
        }
    }

    #[test]
    fn test_native_handler_panic_becomes_fault() {
        let mut store = StateStore::unbounded();
        let mut handler = PanickingHandler;

        let out = dispatcher().dispatch(r#"{"Action":"Info","From":"carol"}"#, &mut store, &mut handler);
        assert_eq!(out.outcome, Outcome::HandlerFault);
        let value = parse(&out.wire);
        assert_eq!(value["Target"], "carol");
        assert_eq!(value["Data"], "Handler fault: native handler bug");
        // no transaction around native handlers
        assert_eq!(store.get("partial"), Some("1"));
    }

    #[test]
    fn test_fallback_is_valid_error_envelope() {
        let value = parse(FALLBACK_ERROR);
        assert_eq!(value["Action"], "Error");
        assert_eq!(value["Target"], "unknown");
    }
}
