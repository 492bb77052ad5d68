//! Per-request render metrics.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use ssr_core::RequestId;

/// Metrics for a single rendered (or failed) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Host adapter name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Request path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Time spent waiting for the asset bundle (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_wait_us: Option<u64>,
    /// Time spent in the render function (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_us: Option<u64>,
    /// Size of the response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_bytes: Option<usize>,
    /// Total request duration (microseconds).
    pub total_duration_us: u64,
    /// HTTP status code.
    pub status_code: u16,
}

/// Collector for request metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    request_id: RequestId,
    host: Option<String>,
    route: Option<String>,
    start: Instant,
    assets_ready: Option<Instant>,
    rendered: Option<Instant>,
    body_bytes: Option<usize>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            host: None,
            route: None,
            start: Instant::now(),
            assets_ready: None,
            rendered: None,
            body_bytes: None,
        }
    }

    /// Set host adapter name.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = Some(host.into());
    }

    /// Set route path.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Record that the asset bundle became available.
    pub fn record_assets_ready(&mut self) {
        self.assets_ready = Some(Instant::now());
    }

    /// Record that the render function returned.
    pub fn record_rendered(&mut self) {
        self.rendered = Some(Instant::now());
    }

    /// Record the final body size.
    pub fn record_body(&mut self, bytes: usize) {
        self.body_bytes = Some(bytes);
    }

    /// Finalize and return the metrics.
    pub fn finalize(self, status_code: u16) -> RequestMetrics {
        let now = Instant::now();
        let start = self.start;

        let asset_wait_us = self
            .assets_ready
            .map(|t| t.duration_since(start).as_micros() as u64);

        let render_us = match (self.assets_ready, self.rendered) {
            (Some(ready), Some(rendered)) => {
                Some(rendered.saturating_duration_since(ready).as_micros() as u64)
            }
            _ => None,
        };

        RequestMetrics {
            request_id: self.request_id.to_string(),
            host: self.host,
            route: self.route,
            asset_wait_us,
            render_us,
            body_bytes: self.body_bytes,
            total_duration_us: now.duration_since(start).as_micros() as u64,
            status_code,
        }
    }
}

fn millis(us: u64) -> String {
    format!("{:.2}ms", us as f64 / 1000.0)
}

impl RequestMetrics {
    /// One line: `<id> <status> <path> assets=.. render=.. body=.. total=..`.
    /// Phases that never happened are left out.
    pub fn to_summary(&self) -> String {
        let mut parts = vec![
            self.request_id.clone(),
            self.status_code.to_string(),
            self.route.clone().unwrap_or_else(|| "-".to_string()),
        ];
        if let Some(wait) = self.asset_wait_us {
            parts.push(format!("assets={}", millis(wait)));
        }
        if let Some(render) = self.render_us {
            parts.push(format!("render={}", millis(render)));
        }
        if let Some(bytes) = self.body_bytes {
            parts.push(format!("body={}B", bytes));
        }
        parts.push(format!("total={}", millis(self.total_duration_us)));
        parts.join(" ")
    }
}
