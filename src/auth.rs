//! Authorization header providers.
//!
//! The client asks its [`AuthProvider`] for a header before every attempt and
//! calls [`AuthProvider::invalidate`] when the server answers with an
//! auth-invalidating status, so the next attempt re-derives the credential.

use std::{error::Error as StdError, fmt, future::Future, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;

use crate::{Error, ErrorDetails, Headers, Notifier, RequestBody, RequestInfo};

/// The request an authorization header is being produced for.
#[derive(Clone, Copy, Debug)]
pub struct AuthRequest<'a> {
    /// Fully resolved URL, query included.
    pub url: &'a str,
    pub method: &'a Method,
    pub body: Option<&'a RequestBody>,
}

/// Failure to produce an authorization header.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Capability that supplies the `authorization` header.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the header value, or `None` to send no authorization.
    async fn header(&self, request: AuthRequest<'_>) -> Result<Option<String>, AuthError>;

    /// Drops any cached credential so the next [`header`](Self::header) call
    /// derives a fresh one.
    fn invalidate(&self) {}

    /// Called once by each client using this provider. Providers may keep the
    /// notifier to report their own retries through the client's listeners.
    fn attach(&self, _notifier: Notifier) {}
}

/// Sends no authorization header.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

#[async_trait]
impl AuthProvider for NoAuth {
    async fn header(&self, _request: AuthRequest<'_>) -> Result<Option<String>, AuthError> {
        Ok(None)
    }
}

/// Static authorization header.
#[derive(Clone)]
pub struct BearerAuth {
    authorization: String,
}

impl fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuth")
            .field("authorization", &"<redacted>")
            .finish()
    }
}

impl BearerAuth {
    /// Creates a provider from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self {
            authorization: normalize_bearer_authorization(token.as_ref()),
        }
    }

    /// Creates a provider from a full raw authorization value.
    ///
    /// Example: `"Basic dXNlcjpwYXNz"` or any custom scheme.
    pub fn raw(authorization: impl Into<String>) -> Self {
        Self {
            authorization: authorization.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for BearerAuth {
    async fn header(&self, _request: AuthRequest<'_>) -> Result<Option<String>, AuthError> {
        Ok(Some(self.authorization.clone()))
    }
}

/// Asynchronous source of bearer tokens, e.g. an OAuth token endpoint.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<String, AuthError>;
}

#[async_trait]
impl<F, Fut> TokenSource for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, AuthError>> + Send + 'static,
{
    async fn fetch_token(&self) -> Result<String, AuthError> {
        (self)().await
    }
}

/// Caches a token from a [`TokenSource`] until invalidated.
///
/// Concurrent callers that find the cache empty wait for a single fetch.
/// A failed fetch is retried up to `fetch_attempts` times in total; each
/// retried fetch is reported through `on_retry` of every attached client.
pub struct CachedTokenAuth<S> {
    source: S,
    cached: Mutex<Option<String>>,
    refresh: tokio::sync::Mutex<()>,
    fetch_attempts: u32,
    fetch_retry_delay: Duration,
    notifiers: Mutex<Vec<Notifier>>,
}

impl<S> fmt::Debug for CachedTokenAuth<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedTokenAuth")
            .field("cached", &self.cached.lock().as_ref().map(|_| "<redacted>"))
            .field("fetch_attempts", &self.fetch_attempts)
            .field("fetch_retry_delay", &self.fetch_retry_delay)
            .finish()
    }
}

impl<S: TokenSource> CachedTokenAuth<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
            refresh: tokio::sync::Mutex::new(()),
            fetch_attempts: 1,
            fetch_retry_delay: Duration::from_millis(500),
            notifiers: Mutex::new(Vec::new()),
        }
    }

    /// Total token fetch attempts per refresh, floored at 1.
    pub fn with_fetch_attempts(mut self, attempts: u32) -> Self {
        self.fetch_attempts = attempts.max(1);
        self
    }

    pub fn with_fetch_retry_delay(mut self, delay: Duration) -> Self {
        self.fetch_retry_delay = delay;
        self
    }

    async fn fetch(&self, request: AuthRequest<'_>) -> Result<String, AuthError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let err = match self.source.fetch_token().await {
                Ok(token) => return Ok(token),
                Err(err) if attempt < self.fetch_attempts => err,
                Err(err) => return Err(err),
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(attempt, error = %err, "token fetch failed, retrying");

            let error = Error::Auth {
                details: Box::new(ErrorDetails::new(
                    request.method,
                    request.url,
                    request.url,
                    attempt,
                )),
                source: err,
            };
            let headers = Headers::new();
            let info = RequestInfo {
                method: request.method,
                url: request.url,
                headers: &headers,
                status: None,
                status_text: None,
            };
            let notifiers = self.notifiers.lock().clone();
            for notifier in &notifiers {
                notifier.retry(&error, &info);
            }

            tokio::time::sleep(self.fetch_retry_delay).await;
        }
    }
}

#[async_trait]
impl<S: TokenSource> AuthProvider for CachedTokenAuth<S> {
    async fn header(&self, request: AuthRequest<'_>) -> Result<Option<String>, AuthError> {
        let cached = self.cached.lock().clone();
        if cached.is_some() {
            return Ok(cached);
        }

        let _refresh = self.refresh.lock().await;
        let cached = self.cached.lock().clone();
        if cached.is_some() {
            return Ok(cached);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(url = request.url, "fetching authorization token");

        let token = self.fetch(request).await?;
        let authorization = normalize_bearer_authorization(&token);
        *self.cached.lock() = Some(authorization.clone());
        Ok(Some(authorization))
    }

    fn invalidate(&self) {
        self.cached.lock().take();
    }

    fn attach(&self, notifier: Notifier) {
        self.notifiers.lock().push(notifier);
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use reqwest::Method;

    use super::{
        normalize_bearer_authorization, AuthError, AuthProvider, AuthRequest, BearerAuth,
        CachedTokenAuth, NoAuth, TokenSource,
    };
    use crate::{Error, Notifier, RequestInfo, RequestListener};

    fn request(method: &Method) -> AuthRequest<'_> {
        AuthRequest {
            url: "https://api.example/v1/items",
            method,
            body: None,
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<String, AuthError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(AuthError::new("token endpoint unavailable"))
            } else {
                Ok(format!("token-{call}"))
            }
        }
    }

    #[derive(Default)]
    struct RetryCounter(AtomicUsize);

    impl RequestListener for RetryCounter {
        fn on_retry(&self, _error: &Error, _info: &RequestInfo<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let auth = BearerAuth::new("secret-token");
        let debug = format!("{auth:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[tokio::test]
    async fn no_auth_contributes_nothing() {
        let method = Method::GET;
        assert_eq!(NoAuth.header(request(&method)).await.expect("must succeed"), None);
    }

    #[tokio::test]
    async fn cached_token_is_reused_until_invalidated() {
        let auth = CachedTokenAuth::new(CountingSource {
            calls: AtomicUsize::new(0),
            failures: 0,
        });
        let method = Method::GET;

        let first = auth.header(request(&method)).await.expect("must fetch");
        let second = auth.header(request(&method)).await.expect("must reuse");
        assert_eq!(first.as_deref(), Some("Bearer token-0"));
        assert_eq!(first, second);
        assert_eq!(auth.source.calls.load(Ordering::SeqCst), 1);

        auth.invalidate();
        let third = auth.header(request(&method)).await.expect("must refetch");
        assert_eq!(third.as_deref(), Some("Bearer token-1"));
        assert_eq!(auth.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_is_retried_and_reported() {
        let listener = Arc::new(RetryCounter::default());
        let auth = CachedTokenAuth::new(CountingSource {
            calls: AtomicUsize::new(0),
            failures: 2,
        })
        .with_fetch_attempts(3);
        auth.attach(Notifier::new(vec![listener.clone() as Arc<dyn RequestListener>]));
        let method = Method::POST;

        let header = auth.header(request(&method)).await.expect("third fetch must succeed");
        assert_eq!(header.as_deref(), Some("Bearer token-2"));
        assert_eq!(listener.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_surfaces_after_attempts_run_out() {
        let auth = CachedTokenAuth::new(CountingSource {
            calls: AtomicUsize::new(0),
            failures: usize::MAX,
        })
        .with_fetch_attempts(2);
        let method = Method::GET;

        let err = auth.header(request(&method)).await.expect_err("fetch must fail");
        assert_eq!(err.to_string(), "token endpoint unavailable");
        assert_eq!(auth.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn closures_are_token_sources() {
        let auth = CachedTokenAuth::new(|| async { Ok::<_, AuthError>("abc".to_owned()) });
        let method = Method::GET;
        let header = auth.header(request(&method)).await.expect("must fetch");
        assert_eq!(header.as_deref(), Some("Bearer abc"));
    }
}
