//! Request options and their layered merge.
//!
//! Options come from three layers: built-in defaults, process-wide defaults
//! set at startup, and per-call overrides. Later layers win key by key. The
//! nested [`TransferOptions`] record is merged the same way one level deeper,
//! independently of its sibling keys.
//!
//! Keys the orchestrator does not know about are kept in `extra` and passed
//! through to collaborators untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Credential policy of the outgoing request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    /// Never send cookies or authorization headers
    Omit,
    /// Send them only to the origin of the base URL
    #[default]
    SameOrigin,
    /// Always send them
    Include,
}

/// Options forwarded to the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Request headers; replaces lower layers' headers as a whole
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    /// Credential policy, `same-origin` when no layer sets it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    /// Other transfer keys, merged key by key
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransferOptions {
    /// Overlay `overrides` on top of `self`.
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut extra = self.extra.clone();
        for (key, value) in &overrides.extra {
            extra.insert(key.clone(), value.clone());
        }

        Self {
            headers: overrides.headers.clone().or_else(|| self.headers.clone()),
            credentials: overrides.credentials.or(self.credentials),
            extra,
        }
    }

    /// Effective credential policy
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        self.credentials.unwrap_or_default()
    }
}

/// Options of a single request call.
///
/// # Example
///
/// ```
/// use courier_core::options::Options;
///
/// let defaults = Options::new().with("history", true).with_header("Accept", "application/json");
/// let call = Options::new().with("history", false);
///
/// let merged = defaults.merged(&call);
/// assert_eq!(merged.flag("history"), Some(false));
/// assert_eq!(merged.header("Accept"), Some("application/json"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Transfer sub-options, merged independently
    pub fetch: TransferOptions,

    /// Caller-defined keys consumed only by collaborators
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Options {
    /// Empty options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a caller-defined key
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Set a request header, creating the header map if needed
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fetch
            .headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Set the credential policy
    #[must_use]
    pub const fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.fetch.credentials = Some(credentials);
        self
    }

    /// Look up a caller-defined key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Look up a caller-defined boolean key
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Look up a header set in the transfer options
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.fetch
            .headers
            .as_ref()?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Overlay `overrides` on top of `self`.
    ///
    /// Top-level keys are replaced one by one; the transfer options are merged
    /// with [`TransferOptions::merged`].
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut extra = self.extra.clone();
        for (key, value) in &overrides.extra {
            extra.insert(key.clone(), value.clone());
        }

        Self {
            fetch: self.fetch.merged(&overrides.fetch),
            extra,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_layer_wins_key_by_key() {
        let defaults = Options::new().with("a", 1).with("b", 2);
        let call = Options::new().with("b", 3).with("c", 4);
        let merged = defaults.merged(&call);

        assert_eq!(merged.get("a"), Some(&json!(1)));
        assert_eq!(merged.get("b"), Some(&json!(3)));
        assert_eq!(merged.get("c"), Some(&json!(4)));
    }

    #[test]
    fn test_transfer_options_merge_independently() {
        let defaults = Options::new()
            .with_header("X-Default", "1")
            .with_credentials(Credentials::Include)
            .with("history", true);
        let call = Options::new().with("history", false);
        let merged = defaults.merged(&call);

        assert_eq!(merged.header("x-default"), Some("1"));
        assert_eq!(merged.fetch.credentials(), Credentials::Include);
        assert_eq!(merged.flag("history"), Some(false));
    }

    #[test]
    fn test_call_headers_replace_default_headers() {
        let defaults = Options::new().with_header("X-Default", "1");
        let call = Options::new().with_header("X-Call", "2");
        let merged = defaults.merged(&call);

        assert_eq!(merged.header("X-Call"), Some("2"));
        assert_eq!(merged.header("X-Default"), None);
    }

    #[test]
    fn test_credentials_default_to_same_origin() {
        assert_eq!(Options::new().fetch.credentials(), Credentials::SameOrigin);
    }

    #[test]
    fn test_deserialize_flattened_keys() {
        let options: Options = serde_json::from_value(json!({
            "fetch": {"credentials": "include", "cache": "no-store"},
            "unique": false
        }))
        .unwrap();

        assert_eq!(options.fetch.credentials, Some(Credentials::Include));
        assert_eq!(options.fetch.extra.get("cache"), Some(&json!("no-store")));
        assert_eq!(options.flag("unique"), Some(false));
    }
}
