//! Route-level cache policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Cache scope determining who can cache the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheScope {
    /// Cacheable by CDN and browser (shared cache).
    Public,
    /// Cacheable by browser only (private cache).
    Private,
    /// No caching.
    #[default]
    NoStore,
}

impl CacheScope {
    /// Get the Cache-Control directive for this scope.
    pub fn cache_control_directive(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::NoStore => "no-store",
        }
    }

    /// Check if this scope allows any caching.
    pub fn allows_caching(&self) -> bool {
        !matches!(self, Self::NoStore)
    }

    /// Check if this scope allows CDN caching.
    pub fn allows_cdn_caching(&self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Cache policy applied to successfully rendered pages.
///
/// Durations are (de)serialized as whole seconds so the policy can be
/// written directly in a config file:
///
/// ```toml
/// scope = "public"
/// max_age = 0
/// s_maxage = 60
/// stale_while_revalidate = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCachePolicy {
    /// Cache scope.
    #[serde(default)]
    pub scope: CacheScope,
    /// Browser time-to-live.
    #[serde(default, with = "secs")]
    pub max_age: Duration,
    /// Shared-cache (CDN) time-to-live.
    #[serde(default, with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub s_maxage: Option<Duration>,
    /// Stale-while-revalidate window.
    #[serde(default, with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub stale_while_revalidate: Option<Duration>,
    /// Stale-if-error window.
    #[serde(default, with = "opt_secs", skip_serializing_if = "Option::is_none")]
    pub stale_if_error: Option<Duration>,
    /// Request headers the response varies on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vary: Vec<String>,
    /// Emit an ETag computed from the rendered body.
    #[serde(default)]
    pub etag: bool,
}

impl Default for RouteCachePolicy {
    fn default() -> Self {
        Self::no_store()
    }
}

impl RouteCachePolicy {
    /// A policy that forbids caching.
    pub fn no_store() -> Self {
        Self {
            scope: CacheScope::NoStore,
            max_age: Duration::ZERO,
            s_maxage: None,
            stale_while_revalidate: None,
            stale_if_error: None,
            vary: Vec::new(),
            etag: false,
        }
    }

    /// Create a public cache policy.
    pub fn public(max_age: Duration) -> Self {
        Self {
            scope: CacheScope::Public,
            max_age,
            ..Self::no_store()
        }
    }

    /// Create a private cache policy.
    pub fn private(max_age: Duration) -> Self {
        Self {
            scope: CacheScope::Private,
            max_age,
            ..Self::no_store()
        }
    }

    /// Browsers always revalidate; the CDN keeps a page for a minute and may
    /// serve it stale for an hour while refreshing in the background.
    pub fn revalidating() -> Self {
        Self::public(Duration::ZERO)
            .with_shared_max_age(Duration::from_secs(60))
            .with_swr(Duration::from_secs(3600))
    }

    /// Set the shared-cache TTL (`s-maxage`).
    pub fn with_shared_max_age(mut self, duration: Duration) -> Self {
        self.s_maxage = Some(duration);
        self
    }

    /// Set stale-while-revalidate window.
    pub fn with_swr(mut self, duration: Duration) -> Self {
        self.stale_while_revalidate = Some(duration);
        self
    }

    /// Set stale-if-error window.
    pub fn with_stale_if_error(mut self, duration: Duration) -> Self {
        self.stale_if_error = Some(duration);
        self
    }

    /// Add a request header the response varies on.
    pub fn vary_on(mut self, header: impl Into<String>) -> Self {
        self.vary.push(header.into());
        self
    }

    /// Emit an ETag for rendered pages.
    pub fn with_etag(mut self) -> Self {
        self.etag = true;
        self
    }

    /// Generate Cache-Control header value.
    pub fn cache_control_header(&self) -> String {
        if !self.scope.allows_caching() {
            return "no-store".to_string();
        }

        let mut parts = vec![
            self.scope.cache_control_directive().to_string(),
            format!("max-age={}", self.max_age.as_secs()),
        ];

        // Shared caches never see private responses.
        if let Some(s_maxage) = self.s_maxage.filter(|_| self.scope.allows_cdn_caching()) {
            parts.push(format!("s-maxage={}", s_maxage.as_secs()));
        }

        if let Some(swr) = self.stale_while_revalidate {
            parts.push(format!("stale-while-revalidate={}", swr.as_secs()));
        }

        if let Some(sie) = self.stale_if_error {
            parts.push(format!("stale-if-error={}", sie.as_secs()));
        }

        parts.join(", ")
    }

    /// Generate Vary header value.
    pub fn vary_header(&self) -> Option<String> {
        if self.vary.is_empty() {
            None
        } else {
            Some(self.vary.join(", "))
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
