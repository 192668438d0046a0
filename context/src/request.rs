/// Header that names the config set to overlay for one request.
pub const DEFAULT_SELECTOR_HEADER: &str = "X-Dynamic-Setting";

/// What the settings engine needs to know about the in-flight request.
///
/// Absence of a selector is a valid state meaning "no dynamic overlay".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    selector: Option<String>
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into())
        }
    }

    /// Config set name carried by this request, if any.
    ///
    /// Blank selectors count as absent.
    pub fn selector(&self) -> Option<&str> {
        self.selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Build a context from request headers using [`DEFAULT_SELECTOR_HEADER`].
    pub fn from_headers<I, K, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>
    {
        Self::from_headers_named(DEFAULT_SELECTOR_HEADER, headers)
    }

    /// Build a context from request headers, reading the selector from
    /// `header`.
    ///
    /// Matching ignores case and treats `_` as `-`, and CGI-style names with
    /// an `HTTP_` prefix (`HTTP_X_DYNAMIC_SETTING`) are accepted as well.
    pub fn from_headers_named<I, K, V>(header: &str, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>
    {
        let wanted = normalize_header(header);
        let selector = headers
            .into_iter()
            .find(|(name, _)| normalize_header(name.as_ref()) == wanted)
            .map(|(_, value)| value.as_ref().to_string());

        Self { selector }
    }
}

fn normalize_header(name: &str) -> String {
    let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
    match normalized.strip_prefix("http-") {
        Some(rest) => rest.to_string(),
        None => normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_from_header() {
        let ctx = RequestContext::from_headers([("X-Dynamic-Setting", "foo")]);
        assert_eq!(ctx.selector(), Some("foo"));
    }

    #[test]
    fn test_selector_header_is_case_insensitive() {
        let ctx = RequestContext::from_headers([("x-dynamic-setting", "bar")]);
        assert_eq!(ctx.selector(), Some("bar"));
    }

    #[test]
    fn test_selector_from_cgi_meta_name() {
        let ctx = RequestContext::from_headers([
            ("HTTP_ACCEPT", "text/html"),
            ("HTTP_X_DYNAMIC_SETTING", "foo"),
        ]);
        assert_eq!(ctx.selector(), Some("foo"));
    }

    #[test]
    fn test_missing_header_means_no_selector() {
        let ctx = RequestContext::from_headers([("Accept", "application/json")]);
        assert_eq!(ctx.selector(), None);
    }

    #[test]
    fn test_blank_selector_is_absent() {
        let ctx = RequestContext::with_selector("   ");
        assert_eq!(ctx.selector(), None);
    }

    #[test]
    fn test_custom_header_name() {
        let headers = vec![("X-Config-Set".to_string(), "canary".to_string())];
        let ctx = RequestContext::from_headers_named("X-Config-Set", headers);
        assert_eq!(ctx.selector(), Some("canary"));
    }
}
