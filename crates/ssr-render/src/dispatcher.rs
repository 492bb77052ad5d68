//! Host-neutral request handling.

use serde::{Deserialize, Serialize};
use ssr_assets::AssetCache;
use ssr_cache::{CacheHeadersBuilder, RouteCachePolicy};
use ssr_core::{RequestContext, ResponseSpec};
use ssr_observability::{LogFormat, LogLevel, MetricsCollector, StructuredLogger};

use crate::{DiagnosticPage, DiagnosticsDisclosure, PipelineError, ShellTemplate};

/// Which request methods reach the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodPolicy {
    /// Only `GET` and `HEAD`; anything else is answered with 405.
    #[default]
    ReadOnly,
    /// Every method renders. For hosts that already route only reads here.
    Any,
}

/// Turns a [`RequestContext`] into a [`ResponseSpec`].
///
/// Shared by every host adapter; holds the process-wide [`AssetCache`].
#[derive(Clone)]
pub struct RenderDispatcher {
    assets: AssetCache,
    cache_policy: RouteCachePolicy,
    method_policy: MethodPolicy,
    disclosure: DiagnosticsDisclosure,
    host: String,
    log_format: LogFormat,
    min_level: LogLevel,
}

impl RenderDispatcher {
    pub fn new(assets: AssetCache) -> Self {
        Self {
            assets,
            cache_policy: RouteCachePolicy::revalidating(),
            method_policy: MethodPolicy::default(),
            disclosure: DiagnosticsDisclosure::default(),
            host: "ssr".to_string(),
            log_format: LogFormat::default(),
            min_level: LogLevel::Info,
        }
    }

    /// Cache policy for successful pages.
    pub fn with_cache_policy(mut self, policy: RouteCachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_method_policy(mut self, policy: MethodPolicy) -> Self {
        self.method_policy = policy;
        self
    }

    pub fn with_disclosure(mut self, disclosure: DiagnosticsDisclosure) -> Self {
        self.disclosure = disclosure;
        self
    }

    /// Host label attached to every log line and metric.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn cache_policy(&self) -> &RouteCachePolicy {
        &self.cache_policy
    }

    pub fn method_policy(&self) -> MethodPolicy {
        self.method_policy
    }

    /// Handle one request. Never fails: errors become a 405 or a diagnostic 500.
    pub async fn handle(&self, ctx: &RequestContext) -> ResponseSpec {
        let logger = StructuredLogger::new(ctx.request_id.clone())
            .with_host(&self.host)
            .with_route(&ctx.path)
            .with_format(self.log_format)
            .with_min_level(self.min_level);
        let mut metrics = MetricsCollector::new(ctx.request_id.clone());
        metrics.set_host(&self.host);
        metrics.set_route(&ctx.path);

        let response = match self.render(ctx, &logger, &mut metrics).await {
            Ok(html) => {
                let headers = CacheHeadersBuilder::new()
                    .from_policy(&self.cache_policy, &html)
                    .build();
                ResponseSpec::html(200, html).with_headers(headers)
            }
            Err(err) => self.error_response(&err, ctx, &logger),
        };

        metrics.record_body(response.body.len());
        let summary = metrics.finalize(response.status);
        logger
            .event(LogLevel::Info, "Request complete")
            .field_i64("status", i64::from(response.status))
            .field_i64("total_us", summary.total_duration_us as i64)
            .emit();
        logger.debug(&summary.to_summary());

        let response = response.with_header("X-Request-ID", ctx.request_id.as_str());
        if ctx.method.omits_body() {
            response.without_body()
        } else {
            response
        }
    }

    async fn render(
        &self,
        ctx: &RequestContext,
        logger: &StructuredLogger,
        metrics: &mut MetricsCollector,
    ) -> Result<String, PipelineError> {
        if self.method_policy == MethodPolicy::ReadOnly && !ctx.method.is_read() {
            return Err(PipelineError::MethodNotAllowed(ctx.method.clone()));
        }

        let bundle = self.assets.ensure_loaded().await?;
        metrics.record_assets_ready();

        logger.event(LogLevel::Info, "Rendering").field("url", ctx.url.as_str()).emit();
        let output = bundle.renderer().render(&ctx.path, bundle.manifest()).await?;
        metrics.record_rendered();

        Ok(ShellTemplate::new(bundle.template_html()).fill_output(&output))
    }

    fn error_response(
        &self,
        err: &PipelineError,
        ctx: &RequestContext,
        logger: &StructuredLogger,
    ) -> ResponseSpec {
        let message = match err {
            PipelineError::MethodNotAllowed(method) => {
                logger
                    .event(LogLevel::Warn, "Method not allowed")
                    .field("method", method.as_str())
                    .emit();
                return ResponseSpec::json(405, &serde_json::json!({ "error": "Method not allowed" }))
                    .with_header("Allow", "GET, HEAD");
            }
            PipelineError::AssetLoad(_) => "Asset load failed",
            PipelineError::Render(_) => "Render failed",
        };
        logger
            .event(LogLevel::Error, message)
            .field("error", err.to_string())
            .field("kind", err.kind())
            .emit();

        let prior = self.assets.last_load_error();
        DiagnosticPage::new(err, ctx, prior.as_deref())
            .with_disclosure(self.disclosure)
            .into_response()
    }
}
