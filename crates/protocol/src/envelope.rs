use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::constants::{CONTENT_ENCODING_UTF8, CONTENT_TYPE_JSON};

/// One transport message: a text body plus string-keyed metadata.
///
/// Properties are kept in a `BTreeMap` so serialized messages are stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl Message {
    /// Creates a message whose body is `payload` serialized as JSON, tagged
    /// with the JSON content type and UTF-8 encoding.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            body: serde_json::to_string(payload)?,
            content_type: Some(CONTENT_TYPE_JSON.to_string()),
            content_encoding: Some(CONTENT_ENCODING_UTF8.to_string()),
            properties: BTreeMap::new(),
        })
    }

    /// Sets a custom property, replacing any previous value.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        self.properties.insert(key.to_string(), value.into());
    }

    /// Builder-style [`set_property`](Self::set_property).
    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_property(key, value);
        self
    }

    /// Returns a property value, if present.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns a property value or [`ProtocolError::MissingProperty`].
    pub fn require_property(&self, key: &str) -> Result<&str, ProtocolError> {
        self.property(key)
            .ok_or_else(|| ProtocolError::MissingProperty(key.to_string()))
    }

    /// Deserializes the body.
    pub fn parse_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Size of the body in bytes, the quantity the transport caps.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}
