//! `resilient-http` is an async HTTP client that retries failed requests.
//!
//! Every call goes through a small decision engine:
//! - statuses in [`ClientOptions::retry_status_codes`] and transient network
//!   errors (`ECONNRESET`, `ECONNREFUSED`, ...) are retried after a delay;
//! - statuses in [`ClientOptions::auth_invalidate_status_codes`] invalidate
//!   the [`AuthProvider`]'s credential and retry at once, at most once per
//!   [`ClientOptions::auth_invalidate_interval_ms`];
//! - anything else fails immediately with a structured [`Error`].
//!
//! JSON helpers ([`HttpClient::get`], [`HttpClient::post`],
//! [`HttpClient::put`], [`HttpClient::delete`]) sit on top of
//! [`HttpClient::send`].

mod auth;
mod classify;
mod client;
mod cooldown;
mod error;
mod headers;
mod notify;
mod options;
mod request;
mod resolve;
mod response;
mod transport;

pub use auth::{
    AuthError, AuthProvider, AuthRequest, BearerAuth, CachedTokenAuth, NoAuth, TokenSource,
};
pub use classify::{classify_response, is_transient_network_code, TRANSIENT_NETWORK_CODES};
pub use client::HttpClient;
pub use error::{Error, ErrorDetails, ErrorKind, NetworkError, RequestError};
pub use headers::{infer_content_type, merge_headers, Headers};
pub use notify::{Notifier, RequestInfo, RequestListener, SendInfo};
pub use options::ClientOptions;
pub use request::{RequestBody, RequestOptions};
pub use reqwest::Method;
pub use resolve::prepare_url;
pub use response::Response;
pub use transport::{ReqwestTransport, Transport, TransportError, TransportRequest};

pub type Result<T> = std::result::Result<T, Error>;
