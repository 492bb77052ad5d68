//! Host-neutral response.

use serde::Serialize;

/// Content type of every HTML response the pipeline produces.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Content type of JSON error bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A complete response, independent of any host's response API.
///
/// Host adapters translate this into their native shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSpec {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in the order they should be written.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: String,
}

impl ResponseSpec {
    /// Create an HTML response.
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), HTML_CONTENT_TYPE.to_string())],
            body: body.into(),
        }
    }

    /// Create a JSON response.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append several headers.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drop the body, keeping status and headers (for `HEAD`).
    pub fn without_body(mut self) -> Self {
        self.body.clear();
        self
    }
}
