//! Inbound AO message model and decode boundary
//!
//! [`decode`] turns a raw JSON envelope into a [`Message`]. Identity and
//! provenance fields are pass-through strings; no address validation happens
//! here. `Action`, `Key` and `Value` are read from top-level fields first and
//! fall back to tags of the same name.

use crate::error::DecodeError;
use crate::tags::{parse_flat_tags, Tags, TagsRepr};
use serde::{Deserialize, Deserializer};

/// Target used when a message carries no `From`
pub const UNKNOWN_SENDER: &str = "unknown";

/// Default inbound size bound (64 KiB)
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Decoded inbound message, owned by the dispatcher for one dispatch call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub id: Option<String>,
    pub from: Option<String>,
    pub owner: Option<String>,
    pub target: Option<String>,
    pub anchor: Option<String>,
    pub data: Option<String>,
    pub tags: Tags,
    pub timestamp: Option<String>,
    pub block_height: Option<String>,
    pub hash_chain: Option<String>,
    pub action: String,
    pub key: Option<String>,
    pub value: Option<String>,
}

impl Message {
    /// Start building a message for `action`
    pub fn builder(action: impl Into<String>) -> MessageBuilder {
        MessageBuilder {
            message: Message {
                action: action.into(),
                ..Message::default()
            },
        }
    }

    /// Reply address: `From`, or `"unknown"` when absent
    pub fn sender(&self) -> &str {
        self.from.as_deref().unwrap_or(UNKNOWN_SENDER)
    }

    /// Look up a tag by name
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

/// Fluent construction of [`Message`] values for native callers and tests
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.message.id = Some(id.into());
        self
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.message.from = Some(from.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.message.owner = Some(owner.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.message.target = Some(target.into());
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.message.data = Some(data.into());
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.message.key = Some(key.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.message.value = Some(value.into());
        self
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.message.tags.insert(name.into(), value.into());
        self
    }

    /// Merge tags from a flattened `k1=v1,k2=v2` string (lenient)
    pub fn flat_tags(mut self, flat: &str) -> Self {
        self.message.tags.extend(parse_flat_tags(flat));
        self
    }

    pub fn build(self) -> Message {
        self.message
    }
}

/// Decoder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Inbound bound in bytes
    pub max_message_bytes: usize,
    /// Reject flattened tag pairs lacking `=` instead of dropping them
    pub strict_tags: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            strict_tags: false,
        }
    }
}

/// Wire envelope before `Action` has been resolved
#[derive(Debug, Default, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "Action", default, deserialize_with = "optional_scalar")]
    action: Option<String>,
    #[serde(rename = "Key", default, deserialize_with = "optional_scalar")]
    key: Option<String>,
    #[serde(rename = "Value", default, deserialize_with = "optional_scalar")]
    value: Option<String>,
    #[serde(rename = "Id", default, deserialize_with = "optional_scalar")]
    id: Option<String>,
    #[serde(rename = "From", default, deserialize_with = "optional_scalar")]
    from: Option<String>,
    #[serde(rename = "Owner", default, deserialize_with = "optional_scalar")]
    owner: Option<String>,
    #[serde(rename = "Target", default, deserialize_with = "optional_scalar")]
    target: Option<String>,
    #[serde(rename = "Anchor", default, deserialize_with = "optional_scalar")]
    anchor: Option<String>,
    #[serde(rename = "Data", default, deserialize_with = "optional_scalar")]
    data: Option<String>,
    #[serde(rename = "Tags", default)]
    tags: Option<TagsRepr>,
    #[serde(rename = "Timestamp", default, deserialize_with = "optional_scalar")]
    timestamp: Option<String>,
    #[serde(rename = "Block-Height", default, deserialize_with = "optional_scalar")]
    block_height: Option<String>,
    #[serde(rename = "Hash-Chain", default, deserialize_with = "optional_scalar")]
    hash_chain: Option<String>,
}

/// Accept strings, numbers and booleans, rendering non-strings as JSON text
fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(scalar.to_string())),
        Some(_) => Err(D::Error::custom("expected a string, number or boolean")),
    }
}

impl RawEnvelope {
    fn into_message(self, options: &DecodeOptions) -> Result<Message, DecodeError> {
        let tags = match self.tags {
            Some(repr) => repr
                .into_tags(options.strict_tags)
                .map_err(|pair| DecodeError::MalformedTag {
                    pair,
                    from: self.from.clone(),
                })?,
            None => Tags::new(),
        };

        let action = match self.action.or_else(|| tags.get("Action").cloned()) {
            Some(action) if !action.is_empty() => action,
            _ => return Err(DecodeError::MissingAction { from: self.from }),
        };
        let key = self.key.or_else(|| tags.get("Key").cloned());
        let value = self.value.or_else(|| tags.get("Value").cloned());

        Ok(Message {
            id: self.id,
            from: self.from,
            owner: self.owner,
            target: self.target,
            anchor: self.anchor,
            data: self.data,
            tags,
            timestamp: self.timestamp,
            block_height: self.block_height,
            hash_chain: self.hash_chain,
            action,
            key,
            value,
        })
    }
}

/// Decode a raw JSON envelope into a [`Message`]
pub fn decode(raw: &str, options: &DecodeOptions) -> Result<Message, DecodeError> {
    decode_slice(raw.as_bytes(), options)
}

/// Decode raw envelope bytes into a [`Message`]
pub fn decode_slice(raw: &[u8], options: &DecodeOptions) -> Result<Message, DecodeError> {
    if raw.len() > options.max_message_bytes {
        return Err(DecodeError::too_large(raw.len(), options.max_message_bytes));
    }

    let envelope: RawEnvelope = serde_json::from_slice(raw).map_err(|e| {
        DecodeError::malformed(format!("JSON parse error: {}", e)).with_sender(recover_sender(raw))
    })?;

    envelope.into_message(options)
}

/// Best-effort `From` of an envelope whose other fields failed to decode
fn recover_sender(raw: &[u8]) -> Option<String> {
    use serde_json::Value;

    let envelope: Value = serde_json::from_slice(raw).ok()?;
    match envelope.get("From")? {
        Value::String(text) => Some(text.clone()),
        scalar @ (Value::Number(_) | Value::Bool(_)) => Some(scalar.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_default(raw: &str) -> Result<Message, DecodeError> {
        decode(raw, &DecodeOptions::default())
    }

    #[test]
    fn test_decode_top_level_fields() {
        let msg = decode_default(
            r#"{"Action":"Set","Key":"name","Value":"Alice","From":"sender-1","Id":"m1"}"#,
        )
        .unwrap();
        assert_eq!(msg.action, "Set");
        assert_eq!(msg.key.as_deref(), Some("name"));
        assert_eq!(msg.value.as_deref(), Some("Alice"));
        assert_eq!(msg.sender(), "sender-1");
        assert_eq!(msg.id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_decode_missing_action_keeps_sender() {
        let err = decode_default(r#"{"From":"sender-1","Key":"k"}"#).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingAction {
                from: Some("sender-1".to_string())
            }
        );
    }

    #[test]
    fn test_decode_empty_action_is_missing() {
        let err = decode_default(r#"{"Action":""}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingAction { from: None }));
    }

    #[test]
    fn test_decode_action_from_tags() {
        let msg = decode_default(r#"{"Tags":{"Action":"Get","Key":"k"}}"#).unwrap();
        assert_eq!(msg.action, "Get");
        assert_eq!(msg.key.as_deref(), Some("k"));
        assert_eq!(msg.sender(), UNKNOWN_SENDER);
    }

    #[test]
    fn test_top_level_wins_over_tags() {
        let msg = decode_default(r#"{"Action":"Info","Tags":{"Action":"Set"}}"#).unwrap();
        assert_eq!(msg.action, "Info");
        assert_eq!(msg.tag("Action"), Some("Set"));
    }

    #[test]
    fn test_decode_scalar_coercion() {
        let msg =
            decode_default(r#"{"Action":"Info","Timestamp":1700000000,"Block-Height":42,"Data":true}"#)
                .unwrap();
        assert_eq!(msg.timestamp.as_deref(), Some("1700000000"));
        assert_eq!(msg.block_height.as_deref(), Some("42"));
        assert_eq!(msg.data.as_deref(), Some("true"));
    }

    #[test]
    fn test_decode_rejects_nested_field() {
        let err = decode_default(r#"{"Action":"Info","From":{"nested":1}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_decode_field_of_wrong_shape_keeps_sender() {
        let err = decode_default(r#"{"Action":"Info","From":"alice","Data":{"n":1}}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
        assert_eq!(err.sender(), Some("alice"));
    }

    #[test]
    fn test_decode_invalid_json() {
        let err = decode_default("{not json").unwrap_err();
        assert!(err.to_string().contains("JSON parse error"));
    }

    #[test]
    fn test_decode_size_bound() {
        let options = DecodeOptions {
            max_message_bytes: 16,
            ..DecodeOptions::default()
        };
        let err = decode(r#"{"Action":"Info","From":"someone"}"#, &options).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { limit: 16, .. }));
    }

    #[test]
    fn test_decode_strict_tags() {
        let options = DecodeOptions {
            strict_tags: true,
            ..DecodeOptions::default()
        };
        let err = decode(r#"{"From":"x","Tags":"Action=Info,broken"}"#, &options).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedTag {
                pair: "broken".to_string(),
                from: Some("x".to_string())
            }
        );
        assert!(decode_default(r#"{"Tags":"Action=Info,broken"}"#).is_ok());
    }

    #[test]
    fn test_builder() {
        let msg = Message::builder("Set")
            .from("alice")
            .key("k")
            .value("v")
            .flat_tags("Extra=1")
            .build();
        assert_eq!(msg.action, "Set");
        assert_eq!(msg.sender(), "alice");
        assert_eq!(msg.tag("Extra"), Some("1"));
    }
}
