//! Request context derived from whatever the host hands us.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Unique request identifier for log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self(format!("{:x}-{:08x}", nanos, rand::random::<u32>()))
    }

    /// Create from an existing ID string (e.g. a platform-provided request id).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// HTTP headers as received, in arrival order.
pub type Headers = Vec<(String, String)>;

/// HTTP request method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    /// Anything else, kept verbatim (uppercased).
    Other(String),
}

impl RequestMethod {
    /// Parse a method name. Matching is case-insensitive.
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }

    /// Get the canonical method name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Other(name) => name,
        }
    }

    /// Whether this is a read method the render pipeline answers.
    pub fn is_read(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }

    /// Whether the response body must be omitted.
    pub fn omits_body(&self) -> bool {
        matches!(self, Self::Head)
    }
}

impl fmt::Display for RequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request context handed to the render pipeline.
///
/// Built by a host adapter from its native request shape. Used for picking
/// the render path and for diagnostics; never persisted.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: RequestId,
    /// HTTP method.
    pub method: RequestMethod,
    /// URL as the host delivered it (absolute, or path plus query).
    pub url: String,
    /// Path component of `url`, without query string or fragment.
    pub path: String,
    /// HTTP headers.
    pub headers: Headers,
    /// When the request entered the pipeline.
    pub received_at: DateTime<Utc>,
}

impl RequestContext {
    /// Create a new request context from a method and a URL.
    pub fn new(method: RequestMethod, url: impl Into<String>) -> Self {
        let url = url.into();
        let path = extract_path(&url);
        Self {
            request_id: RequestId::generate(),
            method,
            url,
            path,
            headers: Vec::new(),
            received_at: Utc::now(),
        }
    }

    /// Attach request headers.
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Use a host-provided request id instead of a generated one.
    pub fn with_request_id(mut self, id: RequestId) -> Self {
        self.request_id = id;
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Extract the path component of a URL.
///
/// Accepts absolute URLs (`https://host/a?b`) and origin-form targets
/// (`/a?b#c`). The query string and fragment are dropped; an empty path
/// becomes `/`.
///
/// A URL is only absolute when `://` comes before any `/`, `?` or `#`, so
/// `/login?next=https://example.com/` keeps its own path.
pub fn extract_path(url: &str) -> String {
    let without_origin = match scheme_end(url) {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            match rest.find(['/', '?', '#']) {
                Some(idx) => &rest[idx..],
                None => "",
            }
        }
        None => url,
    };

    let end = without_origin
        .find(|c| c == '?' || c == '#')
        .unwrap_or(without_origin.len());
    let path = &without_origin[..end];

    if path.is_empty() {
        "/".to_string()
    } else if !path.starts_with('/') {
        format!("/{}", path)
    } else {
        path.to_string()
    }
}

fn scheme_end(url: &str) -> Option<usize> {
    let idx = url.find("://")?;
    if idx == 0 || url[..idx].contains(['/', '?', '#']) {
        return None;
    }
    Some(idx)
}

/// Format an instant the way browsers' `toISOString` does
/// (UTC, millisecond precision, `Z` suffix).
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // === Path Extraction Tests ===

    #[test]
    fn test_extract_path_origin_form() {
        assert_eq!(extract_path("/about"), "/about");
        assert_eq!(extract_path("/about?tab=team"), "/about");
        assert_eq!(extract_path("/about#history"), "/about");
        assert_eq!(extract_path("/about?tab=team#history"), "/about");
    }

    #[test]
    fn test_extract_path_absolute_url() {
        assert_eq!(extract_path("https://example.com/about?x=1"), "/about");
        assert_eq!(extract_path("https://example.com"), "/");
        assert_eq!(extract_path("https://example.com?x=1"), "/");
        assert_eq!(extract_path("http://localhost:8888/a/b/c"), "/a/b/c");
    }

    #[test]
    fn test_extract_path_url_in_query_is_not_origin() {
        assert_eq!(extract_path("/login?next=https://example.com/dashboard"), "/login");
        assert_eq!(extract_path("/go#https://example.com/x"), "/go");
        assert_eq!(extract_path("/r/https://example.com/x"), "/r/https://example.com/x");
        assert_eq!(
            extract_path("https://shop.example.com/login?next=https://example.com/dashboard"),
            "/login"
        );
    }

    #[test]
    fn test_extract_path_empty() {
        assert_eq!(extract_path(""), "/");
        assert_eq!(extract_path("?only=query"), "/");
    }

    #[test]
    fn test_extract_path_relative_gets_leading_slash() {
        assert_eq!(extract_path("about"), "/about");
    }

    // === Method Tests ===

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!(RequestMethod::parse("get"), RequestMethod::Get);
        assert_eq!(RequestMethod::parse("Head"), RequestMethod::Head);
        assert_eq!(
            RequestMethod::parse("propfind"),
            RequestMethod::Other("PROPFIND".to_string())
        );
    }

    #[test]
    fn test_method_is_read() {
        assert!(RequestMethod::Get.is_read());
        assert!(RequestMethod::Head.is_read());
        assert!(!RequestMethod::Post.is_read());
        assert!(!RequestMethod::Other("PURGE".to_string()).is_read());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(RequestMethod::Delete.to_string(), "DELETE");
        assert_eq!(RequestMethod::parse("purge").to_string(), "PURGE");
    }

    // === Context Tests ===

    #[test]
    fn test_context_derives_path() {
        let ctx = RequestContext::new(RequestMethod::Get, "/products/42?ref=home");
        assert_eq!(ctx.url, "/products/42?ref=home");
        assert_eq!(ctx.path, "/products/42");
    }

    #[test]
    fn test_context_header_case_insensitive() {
        let ctx = RequestContext::new(RequestMethod::Get, "/")
            .with_headers(vec![("Accept-Language".to_string(), "en".to_string())]);
        assert_eq!(ctx.header("accept-language"), Some("en"));
        assert_eq!(ctx.header("x-missing"), None);
    }

    #[test]
    fn test_request_ids_differ() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_iso_timestamp_millis() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap();
        assert_eq!(iso_timestamp(&at), "2024-05-01T12:30:15.000Z");
    }
}
