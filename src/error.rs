use serde::Serialize;

use crate::{
    auth::AuthError, classify::is_transient_network_code, transport::TransportError, Response,
};

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Non-success HTTP status, classified from the response body.
    #[error(transparent)]
    Http(Box<RequestError>),
    /// Transport-level failure with no HTTP status.
    #[error(transparent)]
    Network(Box<NetworkError>),
    /// The auth provider failed to produce an authorization header.
    #[error("authorization failed for {} {}: {source}", .details.method, .details.url)]
    Auth {
        details: Box<ErrorDetails>,
        source: AuthError,
    },
    /// The request URL could not be resolved.
    #[error("invalid url '{}': {source}", .details.url)]
    InvalidUrl {
        details: Box<ErrorDetails>,
        source: url::ParseError,
    },
    /// A successful response body was not valid JSON.
    #[error("decode error for {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status of the failed response, if any.
    pub fn status(&self) -> Option<u16> {
        self.details().and_then(|details| details.status)
    }

    pub fn status_text(&self) -> Option<&str> {
        self.response().map(Response::status_text)
    }

    /// System error code of a network failure, e.g. `ECONNRESET`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Network(err) => err.code(),
            _ => None,
        }
    }

    /// Method, URLs, status and attempt count of the failed call.
    pub fn details(&self) -> Option<&ErrorDetails> {
        match self {
            Self::Http(err) => Some(&err.details),
            Self::Network(err) => Some(&err.details),
            Self::Auth { details, .. } | Self::InvalidUrl { details, .. } => Some(details.as_ref()),
            Self::Decode { .. } | Self::Config(_) => None,
        }
    }

    /// Number of attempts made before this error surfaced.
    pub fn attempts(&self) -> Option<u32> {
        self.details().map(|details| details.attempts)
    }

    /// The raw response behind an HTTP error.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Http(err) => err.response(),
            _ => None,
        }
    }

    /// `true` when the error code is on the transient network allowlist.
    pub fn is_transient_network(&self) -> bool {
        self.code().is_some_and(is_transient_network_code)
    }
}

/// Which branch of the classifier produced a [`RequestError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The body parsed as JSON; name and message come from the server.
    Server,
    /// The body was not JSON.
    RequestFailed,
}

/// Structured error for a non-2xx response.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{name}: {message}")]
pub struct RequestError {
    #[serde(skip)]
    pub kind: ErrorKind,
    pub name: String,
    pub message: String,
    pub status: Option<u16>,
    pub details: ErrorDetails,
    #[serde(skip)]
    pub(crate) response: Option<Response>,
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The originating raw response. Never serialized.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }
}

/// Transport failure annotated with the call it belongs to.
#[derive(Debug, thiserror::Error)]
#[error("network error for {} {}: {source}", .details.method, .details.url)]
pub struct NetworkError {
    pub details: ErrorDetails,
    pub source: TransportError,
}

impl NetworkError {
    pub fn code(&self) -> Option<&str> {
        self.source.code()
    }
}

/// Context attached to every request-level error.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ErrorDetails {
    pub method: String,
    pub url: String,
    pub full_url: String,
    pub status: Option<u16>,
    pub attempts: u32,
    /// Extra fields supplied by the server's error payload.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    /// Why the error body could not be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorDetails {
    pub(crate) fn new(method: &reqwest::Method, url: &str, full_url: &str, attempts: u32) -> Self {
        Self {
            method: method.as_str().to_owned(),
            url: url.to_owned(),
            full_url: full_url.to_owned(),
            status: None,
            attempts,
            extra: serde_json::Map::new(),
            cause: None,
        }
    }
}
