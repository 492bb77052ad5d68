//! Response cache headers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::policy::RouteCachePolicy;

/// Builder for cache response headers.
#[derive(Debug, Default)]
pub struct CacheHeadersBuilder {
    cache_control: Option<String>,
    vary: Option<String>,
    etag: Option<String>,
}

impl CacheHeadersBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set Cache-Control header.
    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Set Cache-Control and Vary from a policy, plus an ETag of `body` if
    /// the policy asks for one.
    pub fn from_policy(self, policy: &RouteCachePolicy, body: &str) -> Self {
        let builder = self
            .cache_control(policy.cache_control_header())
            .vary_from_policy(policy);
        if policy.etag && policy.scope.allows_caching() {
            builder.etag(generate_etag(body))
        } else {
            builder
        }
    }

    /// Set Vary header.
    pub fn vary(mut self, value: impl Into<String>) -> Self {
        self.vary = Some(value.into());
        self
    }

    /// Set Vary from policy.
    pub fn vary_from_policy(mut self, policy: &RouteCachePolicy) -> Self {
        self.vary = policy.vary_header();
        self
    }

    /// Set ETag header (quoted on output).
    pub fn etag(mut self, value: impl Into<String>) -> Self {
        self.etag = Some(value.into());
        self
    }

    /// Build the headers.
    pub fn build(self) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        if let Some(cc) = self.cache_control {
            headers.push(("Cache-Control".to_string(), cc));
        }

        if let Some(vary) = self.vary {
            headers.push(("Vary".to_string(), vary));
        }

        if let Some(etag) = self.etag {
            headers.push(("ETag".to_string(), format!("\"{}\"", etag)));
        }

        headers
    }
}

/// Generate a weak-collision ETag from content.
pub fn generate_etag(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_build_from_policy() {
        let policy = RouteCachePolicy::revalidating().vary_on("Accept-Language");
        let headers = CacheHeadersBuilder::new().from_policy(&policy, "<html></html>").build();

        assert_eq!(
            headers,
            vec![
                (
                    "Cache-Control".to_string(),
                    "public, max-age=0, s-maxage=60, stale-while-revalidate=3600".to_string()
                ),
                ("Vary".to_string(), "Accept-Language".to_string()),
            ]
        );
    }

    #[test]
    fn test_etag_only_when_requested() {
        let plain = RouteCachePolicy::public(Duration::from_secs(60));
        let headers = CacheHeadersBuilder::new().from_policy(&plain, "a").build();
        assert!(headers.iter().all(|(k, _)| k != "ETag"));

        let tagged = plain.with_etag();
        let headers = CacheHeadersBuilder::new().from_policy(&tagged, "a").build();
        let etag = headers.iter().find(|(k, _)| k == "ETag").map(|(_, v)| v.clone());
        assert_eq!(etag, Some(format!("\"{}\"", generate_etag("a"))));
    }

    #[test]
    fn test_no_etag_for_no_store() {
        let policy = RouteCachePolicy::no_store().with_etag();
        let headers = CacheHeadersBuilder::new().from_policy(&policy, "a").build();
        assert_eq!(headers, vec![("Cache-Control".to_string(), "no-store".to_string())]);
    }

    #[test]
    fn test_etag_stable_and_content_sensitive() {
        assert_eq!(generate_etag("same"), generate_etag("same"));
        assert_ne!(generate_etag("one"), generate_etag("two"));
    }
}
