use std::collections::BTreeMap;

use crate::RequestBody;

/// Flat header mapping. Keys produced by [`merge_headers`] are lower-cased.
pub type Headers = BTreeMap<String, String>;

/// Merges header layers, lowest precedence first.
///
/// Keys are lower-cased. An empty value counts as "not set": it never clears
/// a value contributed by an earlier layer.
pub fn merge_headers<'a, I>(layers: I) -> Headers
where
    I: IntoIterator<Item = &'a Headers>,
{
    let mut merged = Headers::new();
    for layer in layers {
        for (name, value) in layer {
            if value.is_empty() {
                continue;
            }
            merged.insert(name.to_ascii_lowercase(), value.clone());
        }
    }
    merged
}

/// Guesses a `content-type` for a request body.
///
/// Raw bytes carry no inference; callers set the header explicitly.
pub fn infer_content_type(body: Option<&RequestBody>) -> Option<&'static str> {
    match body? {
        RequestBody::Form(_) => Some("application/x-www-form-urlencoded"),
        RequestBody::Json(serde_json::Value::Null) => None,
        RequestBody::Json(_) => Some("application/json"),
        RequestBody::Text(_) => Some("text/plain"),
        RequestBody::Bytes(_) => None,
    }
}

/// Builds a single-entry header layer, empty when the value is absent.
pub(crate) fn layer(name: &str, value: Option<&str>) -> Headers {
    let mut headers = Headers::new();
    headers.insert(name.to_owned(), value.unwrap_or_default().to_owned());
    headers
}
