use std::{fmt, sync::Arc};

use crate::{
    AuthProvider, BearerAuth, Error, Headers, NoAuth, ReqwestTransport, RequestListener, Result,
    Transport,
};

/// Configures base URL, authentication, retry and credential invalidation.
#[derive(Clone)]
pub struct ClientOptions {
    /// Prefix for relative request URLs. Empty means URLs must be absolute.
    pub base_url: String,
    /// Supplies the `authorization` header.
    pub auth: Arc<dyn AuthProvider>,
    /// Retries after the initial attempt.
    pub retry_attempts: u32,
    /// Delay before each retry in milliseconds.
    pub retry_delay_ms: u64,
    /// Statuses retried without touching credentials.
    pub retry_status_codes: Vec<u16>,
    /// Statuses that invalidate the auth provider's credential.
    pub auth_invalidate_status_codes: Vec<u16>,
    /// Minimum time between two invalidation-triggered retries.
    pub auth_invalidate_interval_ms: u64,
    /// Headers sent with every request.
    pub headers: Headers,
    pub transport: Arc<dyn Transport>,
    pub listeners: Vec<Arc<dyn RequestListener>>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth: Arc::new(NoAuth),
            retry_attempts: 10,
            retry_delay_ms: 500,
            retry_status_codes: vec![429, 500, 502, 503, 504],
            auth_invalidate_status_codes: vec![401, 403],
            auth_invalidate_interval_ms: 60_000,
            headers: Headers::new(),
            transport: Arc::new(ReqwestTransport::new()),
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Headers = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.clone(), "<redacted>".to_owned())
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect();
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("retry_status_codes", &self.retry_status_codes)
            .field(
                "auth_invalidate_status_codes",
                &self.auth_invalidate_status_codes,
            )
            .field(
                "auth_invalidate_interval_ms",
                &self.auth_invalidate_interval_ms,
            )
            .field("headers", &headers)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl ClientOptions {
    /// Transport invocations allowed per call: `retry_attempts + 1`.
    pub fn total_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1).max(1)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Arc::new(auth);
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_retry_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retry_status_codes = codes.into_iter().collect();
        self
    }

    pub fn with_auth_invalidate_status_codes(
        mut self,
        codes: impl IntoIterator<Item = u16>,
    ) -> Self {
        self.auth_invalidate_status_codes = codes.into_iter().collect();
        self
    }

    pub fn with_auth_invalidate_interval_ms(mut self, interval_ms: u64) -> Self {
        self.auth_invalidate_interval_ms = interval_ms;
        self
    }

    /// Adds one default header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Replaces the default headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn RequestListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Loads options from environment variables.
    ///
    /// Reads:
    /// - `RESILIENT_HTTP_BASE_URL` (required)
    /// - `RESILIENT_HTTP_TOKEN` (bearer token, `Bearer` prefix optional)
    /// - `RESILIENT_HTTP_RETRY_ATTEMPTS`
    /// - `RESILIENT_HTTP_RETRY_DELAY_MS`
    /// - `RESILIENT_HTTP_AUTH_INVALIDATE_INTERVAL_MS`
    ///
    /// Unset optional variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientOptions::from_env`] with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("RESILIENT_HTTP_BASE_URL").ok_or_else(|| {
            Error::Config("missing RESILIENT_HTTP_BASE_URL environment variable".to_owned())
        })?;
        if base_url.trim().is_empty() {
            return Err(Error::Config(
                "RESILIENT_HTTP_BASE_URL is set but empty".to_owned(),
            ));
        }

        let mut options = Self::default().with_base_url(base_url.trim());
        if let Some(token) = lookup("RESILIENT_HTTP_TOKEN") {
            if token.trim().is_empty() {
                return Err(Error::Config("RESILIENT_HTTP_TOKEN is set but empty".to_owned()));
            }
            options = options.with_auth(BearerAuth::new(token));
        }
        if let Some(attempts) = parse_var(&lookup, "RESILIENT_HTTP_RETRY_ATTEMPTS")? {
            options.retry_attempts = attempts;
        }
        if let Some(delay) = parse_var(&lookup, "RESILIENT_HTTP_RETRY_DELAY_MS")? {
            options.retry_delay_ms = delay;
        }
        if let Some(interval) = parse_var(&lookup, "RESILIENT_HTTP_AUTH_INVALIDATE_INTERVAL_MS")? {
            options.auth_invalidate_interval_ms = interval;
        }
        Ok(options)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|err| Error::Config(format!("invalid {name} value '{raw}': {err}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::ClientOptions;
    use crate::Error;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let options = ClientOptions::default();
        assert_eq!(options.base_url, "");
        assert_eq!(options.retry_attempts, 10);
        assert_eq!(options.retry_delay_ms, 500);
        assert_eq!(options.retry_status_codes, vec![429, 500, 502, 503, 504]);
        assert_eq!(options.auth_invalidate_status_codes, vec![401, 403]);
        assert_eq!(options.auth_invalidate_interval_ms, 60_000);
        assert!(options.headers.is_empty());
        assert_eq!(options.total_attempts(), 11);
    }

    #[test]
    fn total_attempts_is_at_least_one() {
        assert_eq!(ClientOptions::default().with_retry_attempts(0).total_attempts(), 1);
        assert_eq!(
            ClientOptions::default().with_retry_attempts(u32::MAX).total_attempts(),
            u32::MAX
        );
    }

    #[test]
    fn lookup_reads_all_variables() {
        let options = ClientOptions::from_lookup(lookup(&[
            ("RESILIENT_HTTP_BASE_URL", " https://api.example/v1 "),
            ("RESILIENT_HTTP_TOKEN", "abc"),
            ("RESILIENT_HTTP_RETRY_ATTEMPTS", "3"),
            ("RESILIENT_HTTP_RETRY_DELAY_MS", "25"),
            ("RESILIENT_HTTP_AUTH_INVALIDATE_INTERVAL_MS", "1000"),
        ]))
        .expect("options must load");

        assert_eq!(options.base_url, "https://api.example/v1");
        assert_eq!(options.retry_attempts, 3);
        assert_eq!(options.retry_delay_ms, 25);
        assert_eq!(options.auth_invalidate_interval_ms, 1000);
    }

    #[test]
    fn lookup_requires_base_url() {
        let err = ClientOptions::from_lookup(lookup(&[])).expect_err("must fail");
        assert!(
            matches!(err, Error::Config(message) if message.contains("RESILIENT_HTTP_BASE_URL"))
        );
    }

    #[test]
    fn lookup_rejects_unparseable_numbers() {
        let err = ClientOptions::from_lookup(lookup(&[
            ("RESILIENT_HTTP_BASE_URL", "https://api.example"),
            ("RESILIENT_HTTP_RETRY_ATTEMPTS", "many"),
        ]))
        .expect_err("must fail");
        assert!(matches!(err, Error::Config(message) if message.contains("RETRY_ATTEMPTS")));
    }

    #[test]
    fn debug_redacts_authorization_header() {
        let options = ClientOptions::default().with_header("Authorization", "Bearer secret");
        let debug = format!("{options:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret"));
    }
}
