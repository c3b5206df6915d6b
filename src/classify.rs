use reqwest::Method;

use crate::{ErrorDetails, ErrorKind, RequestError, Response};

/// System error codes treated as transient: the request is retried even
/// though there is no HTTP status to classify.
pub const TRANSIENT_NETWORK_CODES: [&str; 7] = [
    "EAI_AGAIN",
    "EHOSTDOWN",
    "EHOSTUNREACH",
    "ECONNABORTED",
    "ECONNREFUSED",
    "ECONNRESET",
    "EPIPE",
];

pub fn is_transient_network_code(code: &str) -> bool {
    TRANSIENT_NETWORK_CODES.contains(&code)
}

// Keys owned by the call itself; a server payload cannot override them.
const RESERVED_DETAIL_KEYS: [&str; 8] = [
    "method", "url", "full_url", "status", "attempts", "cause", "name", "message",
];

/// Converts a failed response into a [`RequestError`].
///
/// A JSON body contributes `name`, `message` and extra detail fields; any
/// other body yields a generic `RequestFailed` error with the parse failure
/// recorded as `details.cause`. Never fails.
pub fn classify_response(
    method: &Method,
    url: &str,
    response: Response,
    attempts: u32,
) -> RequestError {
    let status = response.status();
    let mut details = ErrorDetails::new(method, url, response.url(), attempts);
    details.status = Some(status);

    let parsed = serde_json::from_str::<serde_json::Value>(&response.text());
    match parsed {
        Ok(payload) => {
            let field = |key: &str| {
                payload
                    .get(key)
                    .and_then(serde_json::Value::as_str)
                    .filter(|value| !value.is_empty())
                    .map(str::to_owned)
            };
            let name = field("name").unwrap_or_else(|| fallback_name(&response));
            let message =
                field("message").unwrap_or_else(|| failure_message(method, url, &response));

            if let serde_json::Value::Object(fields) = &payload {
                details.extra = fields
                    .iter()
                    .filter(|(key, _)| !RESERVED_DETAIL_KEYS.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
            }

            RequestError {
                kind: ErrorKind::Server,
                name,
                message,
                status: Some(status),
                details,
                response: Some(response),
            }
        }
        Err(err) => {
            details.cause = Some(err.to_string());
            RequestError {
                kind: ErrorKind::RequestFailed,
                name: "RequestFailed".to_owned(),
                message: failure_message(method, url, &response),
                status: Some(status),
                details,
                response: Some(response),
            }
        }
    }
}

fn fallback_name(response: &Response) -> String {
    if response.status_text().is_empty() {
        "ServerError".to_owned()
    } else {
        response.status_text().to_owned()
    }
}

fn failure_message(method: &Method, url: &str, response: &Response) -> String {
    format!(
        "Request {method} {url} failed with {} {}",
        response.status(),
        response.status_text()
    )
    .trim_end()
    .to_owned()
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::{classify_response, is_transient_network_code};
    use crate::{ErrorKind, Response};

    #[test]
    fn json_body_supplies_name_message_and_extra_details() {
        let response = Response::new(
            422,
            json!({
                "name": "ValidationError",
                "message": "title is required",
                "field": "title",
                "attempts": 99,
                "status": 200,
                "full_url": "https://evil.example",
                "fullUrl": "https://other.example"
            })
            .to_string(),
        )
        .with_url("https://api.example/v1/items");

        let err = classify_response(&Method::POST, "/items", response, 3);

        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.name, "ValidationError");
        assert_eq!(err.message, "title is required");
        assert_eq!(err.status, Some(422));
        assert_eq!(err.details.method, "POST");
        assert_eq!(err.details.url, "/items");
        assert_eq!(err.details.full_url, "https://api.example/v1/items");
        assert_eq!(err.details.status, Some(422));
        assert_eq!(err.details.attempts, 3);
        assert_eq!(err.details.extra.get("field"), Some(&json!("title")));
        assert!(!err.details.extra.contains_key("attempts"));
        assert!(!err.details.extra.contains_key("status"));
        assert!(!err.details.extra.contains_key("full_url"));
        assert_eq!(err.details.extra.get("fullUrl"), Some(&json!("https://other.example")));
        assert!(err.response().is_some());
    }

    #[test]
    fn json_without_name_falls_back_to_status_text() {
        let response = Response::new(503, r#"{"retry_after": 5}"#);
        let err = classify_response(&Method::GET, "health", response, 1);

        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(err.name, "Service Unavailable");
        assert_eq!(err.message, "Request GET health failed with 503 Service Unavailable");
        assert_eq!(err.details.extra.get("retry_after"), Some(&json!(5)));
    }

    #[test]
    fn unparseable_body_is_request_failed_with_cause() {
        let response = Response::new(502, "<html>bad gateway</html>");
        let err = classify_response(&Method::GET, "items", response, 2);

        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert_eq!(err.name, "RequestFailed");
        assert_eq!(err.message, "Request GET items failed with 502 Bad Gateway");
        assert_eq!(err.status, Some(502));
        assert_eq!(err.details.attempts, 2);
        assert!(err.details.cause.is_some());
        assert_eq!(
            err.response().map(|res| res.text().into_owned()),
            Some("<html>bad gateway</html>".to_owned())
        );
    }

    #[test]
    fn empty_body_is_request_failed() {
        let err = classify_response(&Method::DELETE, "items/1", Response::new(500, ""), 1);
        assert_eq!(err.kind(), ErrorKind::RequestFailed);
    }

    #[test]
    fn transient_codes() {
        assert!(is_transient_network_code("ECONNRESET"));
        assert!(is_transient_network_code("EAI_AGAIN"));
        assert!(!is_transient_network_code("ENOTFOUND"));
        assert!(!is_transient_network_code("ETIMEDOUT"));
    }
}
