//! Call data and request bodies.
//!
//! Data handed to [`make_request`](../../courier_runtime/struct.Orchestrator.html)
//! is modelled as an explicit tagged type instead of being inspected at
//! runtime. [`RequestData`] is the top-level argument; [`DataValue`] is the
//! recursive value the [transformer](crate::transform) flattens; [`Body`] is
//! what finally travels over the wire.
//!
//! # Example
//!
//! ```
//! use courier_core::data::{DataValue, RequestData};
//! use serde_json::json;
//!
//! let data = RequestData::from(json!({"page": 2, "tags": ["a", "b"]}));
//! assert!(matches!(data, RequestData::Fields(_)));
//!
//! let value = DataValue::from(vec![1, 2, 3]);
//! assert_eq!(value, DataValue::List(vec![1.into(), 2.into(), 3.into()]));
//! ```

use bytes::Bytes;
use serde_json::Value;
use std::fmt;

/// A nested value that may be flattened into key/value pairs.
///
/// `Map` keeps insertion order; the transformer never sorts keys.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Absent value, produces no pair at all
    Null,
    /// Boolean scalar (`true` / `false`)
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// Floating point scalar
    Float(f64),
    /// Text scalar
    Text(String),
    /// Ordered sequence, keys are synthesized from the zero-based index
    List(Vec<DataValue>),
    /// Plain structure, keys are synthesized from the entry names
    Map(Vec<(String, DataValue)>),
}

impl DataValue {
    /// Returns `true` for [`DataValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for values that are recursed into rather than emitted.
    #[must_use]
    pub const fn is_compound(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }
}

/// Shortest round-trip form, switching to exponent notation outside
/// `[1e-6, 1e21)` the way number-to-string conversion does.
fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        return f.write_str("NaN");
    }
    if value.is_infinite() {
        return f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if value == 0.0 {
        return f.write_str("0");
    }

    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return write!(f, "{value}");
    }

    let exponential = format!("{value:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            write!(f, "{mantissa}e+{exponent}")
        }
        _ => f.write_str(&exponential),
    }
}

impl fmt::Display for DataValue {
    /// Default string conversion of scalars.
    ///
    /// Compound values render their scalars joined by commas, which is only
    /// reachable when a caller formats them directly.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write_float(f, *value),
            Self::Text(value) => f.write_str(value),
            Self::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Map(_) => write!(f, "[object Object]"),
        }
    }
}

impl From<bool> for DataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for DataValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for DataValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for DataValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for DataValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for DataValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(value) => Self::Bool(value),
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Self::Int(int)
                } else if let Some(float) = number.as_f64().filter(|_| number.is_f64()) {
                    Self::Float(float)
                } else {
                    // u64 above i64::MAX
                    Self::Text(number.to_string())
                }
            }
            Value::String(text) => Self::Text(text),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

/// Submitted form fields, kept in submission order.
///
/// Keys may repeat (multi-select inputs, checkbox groups).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    /// Create an empty form
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a field, keeping any earlier field with the same name
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Builder-style [`append`](Self::append)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// First value submitted under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All fields in submission order
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the form has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// The data argument of a request call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestData {
    /// No data
    #[default]
    Empty,
    /// A bare mapping, flattened into the query (GET/HEAD) or an urlencoded body
    Fields(Vec<(String, DataValue)>),
    /// Form submission, serialized into the query for GET/HEAD, multipart otherwise
    Form(FormData),
    /// Raw or typed body, passed through untouched
    Body(Body),
}

impl RequestData {
    /// Build a [`RequestData::Fields`] from `(name, value)` pairs.
    pub fn fields<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<DataValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Fields(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Returns `true` for [`RequestData::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<Value> for RequestData {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Object(entries) => Self::Fields(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, DataValue::from(value)))
                    .collect(),
            ),
            other => Self::Body(Body::Json(other)),
        }
    }
}

impl From<FormData> for RequestData {
    fn from(form: FormData) -> Self {
        Self::Form(form)
    }
}

impl From<Body> for RequestData {
    fn from(body: Body) -> Self {
        Self::Body(body)
    }
}

impl<T: Into<RequestData>> From<Option<T>> for RequestData {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    /// No payload
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs
    UrlEncoded(Vec<(String, String)>),
    /// `multipart/form-data` fields
    Multipart(FormData),
    /// Plain text
    Text(String),
    /// Raw bytes
    Bytes(Bytes),
    /// JSON document
    Json(Value),
}

impl Body {
    /// Returns `true` for [`Body::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Serializes an [`Body::UrlEncoded`] body; `None` for every other kind.
    #[must_use]
    pub fn to_urlencoded(&self) -> Option<String> {
        match self {
            Self::UrlEncoded(pairs) => Some(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs)
                    .finish(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/panic
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_object_becomes_fields_in_order() {
        let data = RequestData::from(json!({"z": 1, "a": 2}));
        let RequestData::Fields(entries) = data else {
            panic!("object must map to fields");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_json_non_object_is_passed_as_body() {
        assert_eq!(
            RequestData::from(json!([1, 2])),
            RequestData::Body(Body::Json(json!([1, 2])))
        );
        assert_eq!(RequestData::from(json!(null)), RequestData::Empty);
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(DataValue::Float(2.0).to_string(), "2");
        assert_eq!(DataValue::Float(1.5).to_string(), "1.5");
        assert_eq!(DataValue::Float(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(DataValue::Float(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(DataValue::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(DataValue::Float(-0.0).to_string(), "0");
        assert_eq!(DataValue::Float(1e21).to_string(), "1e+21");
        assert_eq!(DataValue::Float(1.5e300).to_string(), "1.5e+300");
        assert_eq!(DataValue::Float(1e20).to_string(), "100000000000000000000");
        assert_eq!(DataValue::Float(1e-7).to_string(), "1e-7");
        assert_eq!(DataValue::Float(-2.5e-8).to_string(), "-2.5e-8");
        assert_eq!(DataValue::Float(0.000_001).to_string(), "0.000001");
        assert_eq!(DataValue::Bool(false).to_string(), "false");
        assert_eq!(DataValue::Int(-3).to_string(), "-3");
    }

    #[test]
    fn test_json_numbers() {
        assert_eq!(DataValue::from(json!(7)), DataValue::Int(7));
        assert_eq!(DataValue::from(json!(0.25)), DataValue::Float(0.25));
        assert_eq!(
            DataValue::from(json!(u64::MAX)),
            DataValue::Text(u64::MAX.to_string())
        );
    }

    #[test]
    fn test_form_data_keeps_duplicates() {
        let form = FormData::new().with("tag", "a").with("tag", "b");
        assert_eq!(form.len(), 2);
        assert_eq!(form.get("tag"), Some("a"));
    }

    #[test]
    fn test_urlencoded_serialization() {
        let body = Body::UrlEncoded(vec![
            ("f[a][0]".to_string(), "1".to_string()),
            ("q".to_string(), "a b".to_string()),
        ]);
        assert_eq!(
            body.to_urlencoded().as_deref(),
            Some("f%5Ba%5D%5B0%5D=1&q=a+b")
        );
        assert_eq!(Body::Text("x".to_string()).to_urlencoded(), None);
    }
}
