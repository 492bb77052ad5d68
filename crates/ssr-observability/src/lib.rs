//! Observability for the SSR pipeline.
//!
//! This crate provides:
//! - `StructuredLogger` - Request-correlated structured logging to stderr
//! - `MetricsCollector` - Asset wait, render time and output size per request

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export RequestId from ssr-core for convenience
pub use ssr_core::RequestId;
