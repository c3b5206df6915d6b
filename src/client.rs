use std::{fmt, sync::Arc, time::Duration};

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    auth::AuthRequest,
    classify::classify_response,
    cooldown::AuthCooldown,
    headers::{infer_content_type, layer, merge_headers},
    transport::TransportRequest,
    ClientOptions, Error, ErrorDetails, Headers, NetworkError, Notifier, RequestBody,
    RequestInfo, RequestOptions, Response, Result, SendInfo,
};

/// HTTP client that retries failed requests and refreshes credentials.
///
/// Clones share configuration, listeners and the auth invalidation cooldown.
#[derive(Clone)]
pub struct HttpClient {
    options: Arc<ClientOptions>,
    cooldown: Arc<AuthCooldown>,
    notifier: Notifier,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("options", &self.options)
            .finish()
    }
}

impl HttpClient {
    /// Creates a client and attaches its listeners to the auth provider.
    pub fn new(options: ClientOptions) -> Self {
        let notifier = Notifier::new(options.listeners.clone());
        options.auth.attach(notifier.clone());
        Self {
            options: Arc::new(options),
            cooldown: Arc::new(AuthCooldown::new()),
            notifier,
        }
    }

    /// Creates a client with default options and the given base URL.
    pub fn from_base_url(base_url: impl Into<String>) -> Self {
        Self::new(ClientOptions::default().with_base_url(base_url))
    }

    /// Creates a client from environment variables.
    ///
    /// See [`ClientOptions::from_env`] for the variables read.
    pub fn from_env() -> Result<Self> {
        ClientOptions::from_env().map(Self::new)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends a JSON `GET` request.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        self.send_json(Method::GET, url, options).await
    }

    /// Sends a JSON `POST` request.
    pub async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        self.send_json(Method::POST, url, options).await
    }

    /// Sends a JSON `PUT` request.
    pub async fn put<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        self.send_json(Method::PUT, url, options).await
    }

    /// Sends a JSON `DELETE` request.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        self.send_json(Method::DELETE, url, options).await
    }

    /// Sends a request with a JSON body and parses a JSON response.
    ///
    /// `content-type: application/json` is set unless the caller overrides
    /// it with a non-empty value. A `204` response or `content-length: 0`
    /// yields `None` without parsing.
    ///
    /// The body is always sent as JSON: text becomes a JSON string, a form
    /// becomes an array of `[name, value]` pairs and raw bytes become an
    /// array of numbers. Use [`HttpClient::send`] to send those bodies in
    /// their own encoding.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<Option<T>> {
        let RequestOptions {
            query,
            headers,
            body,
        } = options;

        let mut json_headers = Headers::new();
        json_headers.insert("content-type".to_owned(), "application/json".to_owned());
        for (name, value) in headers {
            if value.is_empty() {
                continue;
            }
            json_headers.insert(name.to_ascii_lowercase(), value);
        }

        let body = body
            .filter(|body| !body.is_absent())
            .map(|body| RequestBody::Text(body.into_json_text()));

        let options = RequestOptions {
            query,
            headers: json_headers,
            body,
        };
        let response = self.send(method, url, &options).await?;

        if response.status() == 204 || response.header("content-length") == Some("0") {
            return Ok(None);
        }
        response.json().map(Some).map_err(|source| Error::Decode {
            url: response.url().to_owned(),
            source,
        })
    }

    /// Sends a request, retrying until success, a non-retryable failure, or
    /// the attempt budget runs out.
    ///
    /// Statuses in `retry_status_codes` and transient network errors are
    /// retried after `retry_delay_ms`. Statuses in
    /// `auth_invalidate_status_codes` invalidate the auth provider's
    /// credential and are retried immediately, but only when the previous
    /// invalidation is older than `auth_invalidate_interval_ms`.
    ///
    /// The returned error is the last attempt's error, annotated with the
    /// number of attempts made. The final attempt is never followed by a
    /// delay: once the budget is spent, listeners get `on_error` for it
    /// instead of `on_retry`, so `n` retries produce `n` retry events and one
    /// error event.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<Response> {
        let total_attempts = self.options.total_attempts();
        let mut attempted = 0u32;

        loop {
            attempted += 1;
            let mut should_retry = false;
            let mut retry_delay = Duration::from_millis(self.options.retry_delay_ms);

            let error = match self.send_raw(&method, url, options, attempted).await {
                Ok(response) if response.ok() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if self.options.auth_invalidate_status_codes.contains(&status) {
                        let interval =
                            Duration::from_millis(self.options.auth_invalidate_interval_ms);
                        should_retry = self.cooldown.check_and_mark(interval);
                        retry_delay = Duration::ZERO;

                        #[cfg(feature = "tracing")]
                        tracing::debug!(status, retry = should_retry, "invalidating credentials");

                        self.options.auth.invalidate();
                    } else {
                        should_retry = self.options.retry_status_codes.contains(&status);
                    }
                    let classified = classify_response(&method, url, response, attempted);
                    Error::Http(Box::new(classified))
                }
                Err(err) => err,
            };

            let retry =
                (should_retry || error.is_transient_network()) && attempted < total_attempts;
            let info = RequestInfo {
                method: &method,
                url,
                headers: &options.headers,
                status: error.status(),
                status_text: error.status_text(),
            };

            if !retry {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    %method,
                    url,
                    attempts = attempted,
                    error = %error,
                    "request failed"
                );

                self.notifier.error(&error, &info);
                return Err(error);
            }

            #[cfg(feature = "tracing")]
            tracing::debug!(
                %method,
                url,
                attempt = attempted,
                status = ?info.status,
                code = ?error.code(),
                "retrying request after {} ms",
                retry_delay.as_millis()
            );

            self.notifier.retry(&error, &info);
            sleep(retry_delay).await;
        }
    }

    /// Performs exactly one attempt: resolve the URL, fetch the
    /// authorization header, merge headers and call the transport.
    async fn send_raw(
        &self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
        attempt: u32,
    ) -> Result<Response> {
        let full_url = crate::prepare_url(&self.options.base_url, url, &options.query).map_err(
            |source| Error::InvalidUrl {
                details: Box::new(ErrorDetails::new(method, url, "", attempt)),
                source,
            },
        )?;

        let body = options.body.as_ref().filter(|body| !body.is_absent());
        let authorization = self
            .options
            .auth
            .header(AuthRequest {
                url: &full_url,
                method,
                body,
            })
            .await
            .map_err(|source| Error::Auth {
                details: Box::new(ErrorDetails::new(method, url, &full_url, attempt)),
                source,
            })?;

        let headers = merge_headers([
            &layer("content-type", infer_content_type(body)),
            &self.options.headers,
            &layer("authorization", authorization.as_deref()),
            &options.headers,
        ]);

        self.notifier.before_send(&SendInfo {
            method,
            url,
            full_url: &full_url,
            headers: &headers,
        });

        let request = TransportRequest {
            method: method.clone(),
            url: full_url.clone(),
            headers,
            body: body.cloned(),
        };
        self.options
            .transport
            .send(request)
            .await
            .map_err(|source| {
                Error::Network(Box::new(NetworkError {
                    details: ErrorDetails::new(method, url, &full_url, attempt),
                    source,
                }))
            })
    }
}
