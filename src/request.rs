use serde::Serialize;

use crate::Headers;

/// Body of an outgoing request.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Plain text, sent as-is.
    Text(String),
    /// A JSON document, serialized compactly when sent.
    Json(serde_json::Value),
    /// Form fields, sent `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Raw bytes with no inferred content type.
    Bytes(Vec<u8>),
}

impl RequestBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Serializes any value into a [`RequestBody::Json`].
    pub fn json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_value(value).map(Self::Json)
    }

    pub fn form<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Encodes the body into the bytes put on the wire.
    pub fn encode(&self) -> Result<Vec<u8>, serde_urlencoded::ser::Error> {
        match self {
            Self::Text(text) => Ok(text.clone().into_bytes()),
            Self::Json(value) => Ok(value.to_string().into_bytes()),
            Self::Form(fields) => serde_urlencoded::to_string(fields).map(String::into_bytes),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Renders the body as a JSON document for the JSON helpers.
    ///
    /// Text becomes a JSON string, form fields an array of `[name, value]`
    /// pairs and bytes an array of numbers.
    pub(crate) fn into_json_text(self) -> String {
        let value = match self {
            Self::Text(text) => serde_json::Value::String(text),
            Self::Json(value) => value,
            Self::Form(fields) => fields
                .into_iter()
                .map(|(name, value)| serde_json::json!([name, value]))
                .collect(),
            Self::Bytes(bytes) => bytes.into_iter().map(serde_json::Value::from).collect(),
        };
        value.to_string()
    }

    /// `null` JSON counts as no body at all.
    pub(crate) fn is_absent(&self) -> bool {
        matches!(self, Self::Json(serde_json::Value::Null))
    }
}

/// Per-call request options: query, headers and body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Headers,
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query parameter. Order is preserved.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a per-call header. Per-call headers have the highest precedence.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a JSON body from any serializable value.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<Self> {
        Ok(self.body(RequestBody::json(value)?))
    }
}
