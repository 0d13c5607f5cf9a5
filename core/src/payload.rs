//! Decoded response payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// JSON body returned by the server.
///
/// The well-known keys are consumed by collaborators (snippet, redirect and
/// history handlers); any other key is kept in `extra`. An empty payload is
/// what a canceled or aborted call resolves with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Fragment id → replacement content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippets: Option<Map<String, Value>>,

    /// Address to navigate to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,

    /// Follow `redirect` even for non-GET requests
    #[serde(default, deserialize_with = "truthy", skip_serializing_if = "Option::is_none")]
    pub force_redirect: Option<bool>,

    /// The response stands for a full navigation done via POST-redirect-GET
    #[serde(default, deserialize_with = "truthy", skip_serializing_if = "Option::is_none")]
    pub post_get: Option<bool>,

    /// Address of that navigation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Everything else
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    /// Build a payload from any decoded JSON body.
    ///
    /// A body that is not an object carries none of the known keys and
    /// yields an empty payload.
    ///
    /// # Errors
    ///
    /// Returns an error when an object's `snippets`, `redirect` or `url` has
    /// the wrong type.
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(_) => serde_json::from_value(value),
            other => {
                debug!(body = %other, "response body is not an object");
                Ok(Self::default())
            }
        }
    }

    /// Whether no key at all was decoded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snippets.is_none()
            && self.redirect.is_none()
            && self.force_redirect.is_none()
            && self.post_get.is_none()
            && self.url.is_none()
            && self.extra.is_empty()
    }

    /// Snippet content by fragment id, when it is a string
    #[must_use]
    pub fn snippet(&self, id: &str) -> Option<&str> {
        self.snippets.as_ref()?.get(id)?.as_str()
    }

    /// Whether the redirect must be followed regardless of method
    #[must_use]
    pub fn force_redirect(&self) -> bool {
        self.force_redirect.unwrap_or(false)
    }

    /// Look up an extra key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Flags follow truthiness: servers often send `1` or `"1"` for `true`.
fn truthy<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Bool(flag) => Some(flag),
        Value::Number(number) => Some(number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan())),
        Value::String(text) => Some(!text.is_empty()),
        Value::Array(_) | Value::Object(_) => Some(true),
    })
}
