//! Node-style serverless adapter.
//!
//! The host hands the function an incoming message and a mutable response
//! it fills through `status`, `set_header`, `send` and `json`.

use std::path::Path;

use serde::Serialize;
use ssr_assets::{AssetCache, AssetLoader, RenderModuleLoader};
use ssr_cache::RouteCachePolicy;
use ssr_core::{ArtifactLayout, Headers, ResponseSpec, JSON_CONTENT_TYPE};
use ssr_render::{MethodPolicy, RenderDispatcher};

use crate::{request_context, SsrConfig};

/// Artifact root relative to the deployed function file.
pub const NODE_ARTIFACT_OFFSET: &str = "../dist";

/// Request as a Node-style host delivers it.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub method: String,
    /// Path plus query. Absent on some hosts; treated as `/`.
    pub url: Option<String>,
    pub headers: Headers,
}

impl IncomingMessage {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: Some(url.into()),
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Mutable response a Node-style handler writes into.
#[derive(Debug, Clone)]
pub struct ServerResponse {
    status_code: u16,
    headers: Headers,
    body: Option<String>,
}

impl Default for ServerResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerResponse {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn status(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self
    }

    /// Set a header, replacing any existing value (case-insensitive name).
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Finish the response with `body`.
    pub fn send(&mut self, body: impl Into<String>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Finish the response with a JSON body.
    pub fn json<T: Serialize>(&mut self, value: &T) -> &mut Self {
        if self.header("Content-Type").is_none() {
            self.set_header("Content-Type", JSON_CONTENT_TYPE);
        }
        let body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
        self.send(body)
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Body sent so far; `None` until `send` or `json`.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn is_sent(&self) -> bool {
        self.body.is_some()
    }

    fn write(&mut self, spec: ResponseSpec) {
        self.status(spec.status);
        for (name, value) in spec.headers {
            self.set_header(name, value);
        }
        self.send(spec.body);
    }
}

/// Node-style entry point: explicit read-method check, CDN revalidation caching.
#[derive(Clone)]
pub struct NodeHandler {
    dispatcher: RenderDispatcher,
}

impl NodeHandler {
    pub fn new(assets: AssetCache) -> Self {
        Self::from_dispatcher(
            RenderDispatcher::new(assets)
                .with_host("node")
                .with_cache_policy(RouteCachePolicy::revalidating())
                .with_method_policy(MethodPolicy::ReadOnly),
        )
    }

    pub fn from_dispatcher(dispatcher: RenderDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Artifacts at `../dist` relative to the deployed function file.
    pub fn default_layout(deployment_file: impl AsRef<Path>) -> ArtifactLayout {
        ArtifactLayout::beside(deployment_file, NODE_ARTIFACT_OFFSET)
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

    pub fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }

    /// Handle one request, writing the outcome into `res`.
    pub async fn handle(&self, req: &IncomingMessage, res: &mut ServerResponse) {
        let url = req.url.as_deref().unwrap_or("/");
        let ctx = request_context(&req.method, url, req.headers.clone());
        let spec = self.dispatcher.handle(&ctx).await;
        res.write(spec);
    }
}
