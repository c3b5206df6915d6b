use std::{error::Error as StdError, fmt, io, time::Duration};

use async_trait::async_trait;
use reqwest::Method;

use crate::{Headers, RequestBody, Response};

/// A single outgoing request, fully resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestBody>,
}

/// Performs one HTTP exchange. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<Response, TransportError>;
}

/// Transport failure with an optional system error code such as `ECONNRESET`.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    code: Option<String>,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let code = reqwest_error_code(&err);
        let mut transport = Self::new(err.to_string()).with_source(err);
        transport.code = code.map(str::to_owned);
        transport
    }
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    timeout: Option<Duration>,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing client, e.g. one with custom TLS or proxy settings.
    pub fn from_client(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: None,
        }
    }

    /// Applies a per-request timeout. Timeouts are not retried.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<Response, TransportError> {
        let mut builder = self.http.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            let bytes = body.encode().map_err(|err| {
                TransportError::new(format!("failed to encode request body: {err}"))
                    .with_source(err)
            })?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await.map_err(TransportError::from_reqwest)?;

        let status = response.status();
        let mut converted = Response::new(status.as_u16(), Vec::new())
            .with_status_text(status.canonical_reason().unwrap_or_default())
            .with_url(response.url().as_str());
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            headers
                .entry(name.as_str().to_owned())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_owned());
        }
        for (name, value) in headers {
            converted = converted.with_header(name, value);
        }

        let body = response
            .bytes()
            .await
            .map_err(TransportError::from_reqwest)?;
        Ok(converted.with_body(body.to_vec()))
    }
}

/// Maps a reqwest failure to a system error code by walking its source chain.
fn reqwest_error_code(err: &reqwest::Error) -> Option<&'static str> {
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    let mut chain = err.to_string();
    while let Some(cause) = source {
        if let Some(code) = cause.downcast_ref::<io::Error>().and_then(io_error_code) {
            return Some(code);
        }
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }

    if err.is_timeout() {
        Some("ETIMEDOUT")
    } else if chain.contains("Temporary failure in name resolution") {
        Some("EAI_AGAIN")
    } else if chain.contains("dns error") {
        Some("ENOTFOUND")
    } else {
        None
    }
}

fn io_error_code(err: &io::Error) -> Option<&'static str> {
    match err.kind() {
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::ConnectionAborted => Some("ECONNABORTED"),
        io::ErrorKind::BrokenPipe => Some("EPIPE"),
        io::ErrorKind::HostUnreachable => Some("EHOSTUNREACH"),
        io::ErrorKind::NetworkUnreachable => Some("ENETUNREACH"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        _ => host_down_code(err),
    }
}

#[cfg(target_os = "linux")]
fn host_down_code(err: &io::Error) -> Option<&'static str> {
    (err.raw_os_error() == Some(112)).then_some("EHOSTDOWN")
}

#[cfg(target_os = "macos")]
fn host_down_code(err: &io::Error) -> Option<&'static str> {
    (err.raw_os_error() == Some(64)).then_some("EHOSTDOWN")
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn host_down_code(_err: &io::Error) -> Option<&'static str> {
    None
}
