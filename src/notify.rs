use std::{fmt, sync::Arc};

use reqwest::Method;

use crate::{Error, Headers};

/// Emitted right before each transport call.
#[derive(Clone, Copy, Debug)]
pub struct SendInfo<'a> {
    pub method: &'a Method,
    /// URL as passed by the caller.
    pub url: &'a str,
    /// URL after base resolution and query encoding.
    pub full_url: &'a str,
    /// Final merged headers, authorization included.
    pub headers: &'a Headers,
}

/// Context passed with retry and error notifications.
#[derive(Clone, Copy, Debug)]
pub struct RequestInfo<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    /// Per-call headers only.
    pub headers: &'a Headers,
    pub status: Option<u16>,
    pub status_text: Option<&'a str>,
}

/// Observer for request lifecycle events.
///
/// `on_retry` fires once per retried attempt. `on_error` fires at most once
/// per call, for its terminal failure. All methods default to no-ops.
pub trait RequestListener: Send + Sync {
    fn before_send(&self, _info: &SendInfo<'_>) {}

    fn on_retry(&self, _error: &Error, _info: &RequestInfo<'_>) {}

    fn on_error(&self, _error: &Error, _info: &RequestInfo<'_>) {}
}

/// Fans events out to every registered listener.
#[derive(Clone, Default)]
pub struct Notifier {
    listeners: Arc<Vec<Arc<dyn RequestListener>>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Notifier {
    pub fn new(listeners: Vec<Arc<dyn RequestListener>>) -> Self {
        Self {
            listeners: Arc::new(listeners),
        }
    }

    pub fn before_send(&self, info: &SendInfo<'_>) {
        for listener in self.listeners.iter() {
            listener.before_send(info);
        }
    }

    pub fn retry(&self, error: &Error, info: &RequestInfo<'_>) {
        for listener in self.listeners.iter() {
            listener.on_retry(error, info);
        }
    }

    pub fn error(&self, error: &Error, info: &RequestInfo<'_>) {
        for listener in self.listeners.iter() {
            listener.on_error(error, info);
        }
    }
}
