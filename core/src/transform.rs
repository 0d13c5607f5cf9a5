//! Flattening of call data into key/value pairs.
//!
//! The transfer layer only accepts flat pairs or raw bytes, so nested call
//! data is flattened with bracketed keys:
//!
//! ```text
//! {a: [1, {x: 2}], b: null}   under root "f"
//!   → f[a][0]=1
//!   → f[a][1][x]=2
//! ```
//!
//! Nulls are dropped, empty lists and maps contribute nothing, and keys are
//! emitted in iteration order, never sorted.

use crate::data::{Body, DataValue, RequestData};
use http::Method;
use url::Url;

/// Destination of flattened pairs.
pub trait PairSink {
    /// Append one pair, keeping earlier pairs with the same key
    fn append_pair(&mut self, key: &str, value: &str);
}

impl PairSink for Vec<(String, String)> {
    fn append_pair(&mut self, key: &str, value: &str) {
        self.push((key.to_string(), value.to_string()));
    }
}

/// Recursively append `value` to `sink` under `key`.
pub fn append_to_query<S: PairSink + ?Sized>(sink: &mut S, key: &str, value: &DataValue) {
    match value {
        DataValue::Null => {}
        DataValue::List(items) => {
            for (index, item) in items.iter().enumerate() {
                append_to_query(sink, &format!("{key}[{index}]"), item);
            }
        }
        DataValue::Map(entries) => {
            for (subkey, item) in entries {
                append_to_query(sink, &format!("{key}[{subkey}]"), item);
            }
        }
        scalar => sink.append_pair(key, &scalar.to_string()),
    }
}

/// Flatten top-level `(key, value)` entries into `sink`.
pub fn flatten_into<S: PairSink + ?Sized>(sink: &mut S, entries: &[(String, DataValue)]) {
    for (key, value) in entries {
        append_to_query(sink, key, value);
    }
}

/// Flatten top-level entries into a fresh pair list.
#[must_use]
pub fn flatten(entries: &[(String, DataValue)]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    flatten_into(&mut pairs, entries);
    pairs
}

/// Whether `method` carries its data in the URL rather than the body.
///
/// Compared case-insensitively, so an extension method spelled `get` counts.
#[must_use]
pub fn is_query_method(method: &Method) -> bool {
    let name = method.as_str();
    name.eq_ignore_ascii_case("GET") || name.eq_ignore_ascii_case("HEAD")
}

/// Compute the request body for `data`, appending to `url`'s query when the
/// method is GET or HEAD.
///
/// - GET/HEAD form → fields appended to the query, empty body
/// - bare mapping → flattened into the query (GET/HEAD) or an urlencoded body
/// - anything else → passed through, forms on other methods become multipart
#[must_use]
pub fn transform_data(url: &mut Url, method: &Method, data: &RequestData) -> Body {
    let query_method = is_query_method(method);

    match data {
        RequestData::Form(form) if query_method => {
            if !form.is_empty() {
                let mut query = url.query_pairs_mut();
                for (name, value) in form.entries() {
                    query.append_pair(name, value);
                }
            }
            Body::Empty
        }
        RequestData::Form(form) => Body::Multipart(form.clone()),
        RequestData::Fields(entries) if query_method => {
            let pairs = flatten(entries);
            // Touching `query_pairs_mut` with nothing to add would leave a bare `?`
            if !pairs.is_empty() {
                let mut query = url.query_pairs_mut();
                for (key, value) in &pairs {
                    query.append_pair(key, value);
                }
            }
            Body::Empty
        }
        RequestData::Fields(entries) => Body::UrlEncoded(flatten(entries)),
        RequestData::Body(body) => body.clone(),
        RequestData::Empty => Body::Empty,
    }
}
