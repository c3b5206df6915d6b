use std::borrow::Cow;

use url::Url;

/// Resolves a request path against the configured base URL.
///
/// A trailing slash is added to a non-empty base and one leading slash is
/// stripped from `path`, so `/items` joins *under* the base path instead of
/// replacing it. The query string always comes from `query`: an empty slice
/// clears any query already present in `path`.
///
/// ```
/// use resilient_http::prepare_url;
///
/// let url = prepare_url("https://api.example/v1", "/items", &[]).unwrap();
/// assert_eq!(url, "https://api.example/v1/items");
/// ```
pub fn prepare_url(
    base_url: &str,
    path: &str,
    query: &[(String, String)],
) -> Result<String, url::ParseError> {
    let relative = path.strip_prefix('/').unwrap_or(path);

    let mut resolved = if base_url.is_empty() {
        Url::parse(relative)?
    } else {
        let base: Cow<'_, str> = if base_url.ends_with('/') {
            Cow::Borrowed(base_url)
        } else {
            Cow::Owned(format!("{base_url}/"))
        };
        Url::parse(&base)?.join(relative)?
    };

    if query.is_empty() {
        resolved.set_query(None);
    } else {
        resolved.query_pairs_mut().clear().extend_pairs(query);
    }

    Ok(resolved.into())
}

#[cfg(test)]
mod tests {
    use super::prepare_url;

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn leading_slash_does_not_truncate_base_path() {
        let url = prepare_url("https://api.example/v1/", "/items", &[]).expect("must resolve");
        assert_eq!(url, "https://api.example/v1/items");
    }

    #[test]
    fn base_without_trailing_slash_keeps_last_segment() {
        let url = prepare_url("https://api.example/v1", "items", &[]).expect("must resolve");
        assert_eq!(url, "https://api.example/v1/items");
    }

    #[test]
    fn query_mapping_is_appended() {
        let url = prepare_url("https://api.example/v1/", "items", &query(&[("a", "1")]))
            .expect("must resolve");
        assert_eq!(url, "https://api.example/v1/items?a=1");
    }

    #[test]
    fn empty_query_clears_existing_query() {
        let url =
            prepare_url("https://api.example/v1/", "items?stale=1", &[]).expect("must resolve");
        assert_eq!(url, "https://api.example/v1/items");
    }

    #[test]
    fn query_mapping_replaces_existing_query() {
        let url = prepare_url(
            "https://api.example/",
            "search?stale=1",
            &query(&[("q", "a b"), ("page", "2")]),
        )
        .expect("must resolve");
        assert_eq!(url, "https://api.example/search?q=a+b&page=2");
    }

    #[test]
    fn absolute_url_without_base() {
        let url = prepare_url("", "https://other.example/x", &[]).expect("must resolve");
        assert_eq!(url, "https://other.example/x");
    }

    #[test]
    fn relative_url_without_base_is_rejected() {
        assert!(prepare_url("", "/items", &[]).is_err());
    }
}
