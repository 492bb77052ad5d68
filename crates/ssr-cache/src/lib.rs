//! Caching policy for rendered pages.
//!
//! This crate provides:
//! - `RouteCachePolicy` - Time-bounded public caching, optionally with
//!   shared-cache TTL and stale-while-revalidate
//! - `CacheHeadersBuilder` - Cache-Control, Vary and ETag response headers
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use ssr_cache::RouteCachePolicy;
//!
//! let policy = RouteCachePolicy::public(Duration::ZERO)
//!     .with_shared_max_age(Duration::from_secs(60))
//!     .with_swr(Duration::from_secs(3600));
//!
//! assert_eq!(
//!     policy.cache_control_header(),
//!     "public, max-age=0, s-maxage=60, stale-while-revalidate=3600"
//! );
//! ```

mod headers;
mod policy;

pub use headers::*;
pub use policy::*;
