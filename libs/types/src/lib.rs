//! # AO Message Types
//!
//! Canonical representation of the messages an AO process receives from the
//! messaging fabric and of the responses it sends back.
//!
//! ## Data Flow
//!
//! ```text
//! raw JSON ──decode──▶ Message ──handler──▶ Response ──encode──▶ raw JSON
//! ```
//!
//! - [`Message`]: identity, provenance, target, tags and payload of one inbound
//!   message. `Action` is the only required field.
//! - [`Response`]: `{"Target", "Action", "Key"?, "Data"?}` envelope, where `Data`
//!   is either text or a nested key/value object (`List-Response`).
//! - [`tags`]: the three tag encodings seen on the wire (object, AO tag list,
//!   flattened `k1=v1,k2=v2` string).
//!
//! ## Usage
//!
//! ```rust
//! use ao_types::{decode, DecodeOptions, Response};
//!
//! let msg = decode(r#"{"Action":"Get","Key":"name","From":"alice"}"#, &DecodeOptions::default())?;
//! assert_eq!(msg.action, "Get");
//!
//! let reply = Response::reply(msg.sender(), &msg.action).with_data("Alice");
//! assert_eq!(reply.encode()?, r#"{"Target":"alice","Action":"Get-Response","Data":"Alice"}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod message;
pub mod response;
pub mod tags;

pub use error::DecodeError;
pub use message::{decode, decode_slice, DecodeOptions, Message, MessageBuilder, UNKNOWN_SENDER};
pub use response::{Response, ResponseData, ERROR_ACTION};
pub use tags::{parse_flat_tags, parse_flat_tags_strict, Tags};
