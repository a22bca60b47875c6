//! Outbound response envelope
//!
//! Wire shape: `{"Target": <sender>, "Action": <name>, "Key"?: <key>, "Data"?: <payload>}`.
//! Success actions are named `<Action>-Response`; failures use `"Error"` with a
//! human-readable reason in `Data`. All escaping is left to `serde_json`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Action name carried by every error response
pub const ERROR_ACTION: &str = "Error";

/// Payload of the `Data` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Plain text payload
    Text(String),
    /// Nested key/value object; an empty map encodes as `{}`
    Entries(IndexMap<String, String>),
}

/// Response produced fresh per dispatch and owned by the caller afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "Target")]
    pub target: String,

    #[serde(rename = "Action")]
    pub action: String,

    #[serde(rename = "Key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl Response {
    pub fn new(target: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            action: action.into(),
            key: None,
            data: None,
        }
    }

    /// Success response for `action`, named `<action>-Response`
    pub fn reply(target: impl Into<String>, action: &str) -> Self {
        Self::new(target, format!("{}-Response", action))
    }

    /// Error response carrying `reason` in `Data`
    pub fn error(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(target, ERROR_ACTION).with_data(reason)
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(ResponseData::Text(data.into()));
        self
    }

    pub fn with_entries(mut self, entries: IndexMap<String, String>) -> Self {
        self.data = Some(ResponseData::Entries(entries));
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.action == ERROR_ACTION
    }

    /// Text payload, if `Data` is text
    pub fn data_text(&self) -> Option<&str> {
        match &self.data {
            Some(ResponseData::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Nested payload, if `Data` is an object
    pub fn entries(&self) -> Option<&IndexMap<String, String>> {
        match &self.data {
            Some(ResponseData::Entries(entries)) => Some(entries),
            _ => None,
        }
    }

    /// Serialize to the JSON wire format
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a wire response
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
