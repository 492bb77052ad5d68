//! Fetch-style edge adapter.
//!
//! The host calls the handler with a request and awaits a response value.
//! Routing is done by the host (see [`FetchHandler::ROUTE`]), so every method
//! it forwards is rendered unless the method check is switched on.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::{Request, Response, StatusCode};
use ssr_assets::{AssetCache, AssetLoader, RenderModuleLoader};
use ssr_cache::RouteCachePolicy;
use ssr_core::{ArtifactLayout, ResponseSpec};
use ssr_render::{MethodPolicy, RenderDispatcher};

use crate::{request_context, SsrConfig};

/// Artifact root relative to the deployed function file.
pub const FETCH_ARTIFACT_OFFSET: &str = "../../dist";

/// Fetch-style entry point: host-side routing, one-hour public caching.
#[derive(Clone)]
pub struct FetchHandler {
    dispatcher: RenderDispatcher,
}

impl FetchHandler {
    /// Route the handler is registered on.
    pub const ROUTE: &'static str = "/*";

    pub fn new(assets: AssetCache) -> Self {
        Self::from_dispatcher(
            RenderDispatcher::new(assets)
                .with_host("fetch")
                .with_cache_policy(RouteCachePolicy::public(Duration::from_secs(3600)))
                .with_method_policy(MethodPolicy::Any),
        )
    }

    pub fn from_dispatcher(dispatcher: RenderDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Artifacts at `../../dist` relative to the deployed function file.
    pub fn default_layout(deployment_file: impl AsRef<Path>) -> ArtifactLayout {
        ArtifactLayout::beside(deployment_file, FETCH_ARTIFACT_OFFSET)
    }

    /// Handler for a function deployed at `deployment_file`.
    pub fn beside(deployment_file: impl AsRef<Path>, modules: impl RenderModuleLoader + 'static) -> Self {
        Self::new(AssetCache::new(AssetLoader::new(
            Self::default_layout(deployment_file),
            modules,
        )))
    }

    /// Handler with file configuration applied over the defaults. Also installs
    /// the `tracing` subscriber unless one is already set.
    pub fn from_config(config: &SsrConfig, deployment_file: impl AsRef<Path>) -> Self {
        config.init_tracing();
        Self::new(config.asset_cache(Self::default_layout(deployment_file))).configured(config)
    }

    /// Apply file configuration to this handler's dispatcher.
    pub fn configured(self, config: &SsrConfig) -> Self {
        Self::from_dispatcher(config.configure(self.dispatcher))
    }

    /// Reject non-read methods with 405 like the Node adapter does.
    pub fn with_method_check(self) -> Self {
        Self::from_dispatcher(self.dispatcher.with_method_policy(MethodPolicy::ReadOnly))
    }

    pub fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }

    /// Handle one request. The request body is never read, and the returned
    /// future does not borrow the request.
    pub fn handle<B>(&self, req: &Request<B>) -> impl Future<Output = Response<String>> + Send + '_ {
        let headers = req
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let ctx = request_context(req.method().as_str(), &req.uri().to_string(), headers);
        async move { into_http_response(self.dispatcher.handle(&ctx).await) }
    }
}

/// Translate a neutral response. Headers that are not valid HTTP are dropped.
pub fn into_http_response(spec: ResponseSpec) -> Response<String> {
    let mut response = Response::new(spec.body);
    *response.status_mut() =
        StatusCode::from_u16(spec.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in spec.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().append(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid response header"),
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_http_response() {
        let spec = ResponseSpec::html(200, "<p>ok</p>").with_header("Cache-Control", "public, max-age=3600");
        let response = into_http_response(spec);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
        assert_eq!(response.headers()["cache-control"], "public, max-age=3600");
        assert_eq!(response.body(), "<p>ok</p>");
    }

    #[test]
    fn test_invalid_header_dropped() {
        let spec = ResponseSpec::html(500, "").with_header("Bad Header", "x");
        let response = into_http_response(spec);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn test_default_layout() {
        let layout = FetchHandler::default_layout("/var/task/netlify/functions/render.mjs");
        assert_eq!(layout.root, std::path::PathBuf::from("/var/task/dist"));
    }

    #[test]
    fn test_route() {
        assert_eq!(FetchHandler::ROUTE, "/*");
    }
}
