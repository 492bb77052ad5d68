//! End-to-end behaviour of both host adapters over a real artifact tree.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::{Method, Request, StatusCode};
use ssr_assets::{
    AssetCache, AssetLoadError, AssetLoader, FnRenderer, RenderFailure, RenderModuleLoader,
    RenderOutput, Renderer, SsrManifest,
};
use ssr_core::{ArtifactLayout, LoadPhase};
use ssr_host::{FetchHandler, IncomingMessage, NodeHandler, ServerResponse, SsrConfig};
use ssr_render::DiagnosticsDisclosure;
use tempfile::TempDir;

const SHELL: &str = "<!DOCTYPE html><html><head><!--app-head--></head><body><div id=\"app\"><!--app-html--></div></body></html>";

/// Render entry that records how often it was loaded and called.
struct TestModule {
    loads: Arc<AtomicUsize>,
    renders: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderModuleLoader for TestModule {
    async fn load(&self, entry: &Path) -> Result<Arc<dyn Renderer>, AssetLoadError> {
        if !entry.exists() {
            return Err(AssetLoadError::RenderModuleMissing {
                path: entry.to_path_buf(),
            });
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let renders = self.renders.clone();
        Ok(Arc::new(FnRenderer::new(move |path: &str, _: &SsrManifest| {
            renders.fetch_add(1, Ordering::SeqCst);
            match path {
                "/about" => Ok(RenderOutput::new()
                    .with_head("<title>About</title>")
                    .with_html("<h1>About</h1>")),
                "/broken" => Err(RenderFailure::new("Cannot read properties of undefined (reading '<script>')")
                    .with_stack("TypeError: Cannot read properties of undefined\n    at render (entry-server.js:12:5)")),
                _ => Ok(RenderOutput::new()),
            }
        })))
    }
}

struct Fixture {
    dir: TempDir,
    loads: Arc<AtomicUsize>,
    renders: Arc<AtomicUsize>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        Self {
            dir,
            loads: Arc::new(AtomicUsize::new(0)),
            renders: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write_template(&self, html: &str) {
        std::fs::create_dir_all(self.root().join("client/.vite")).unwrap();
        std::fs::write(self.root().join("client/index.html"), html).unwrap();
    }

    fn write_manifest(&self, json: &str) {
        std::fs::create_dir_all(self.root().join("client/.vite")).unwrap();
        std::fs::write(self.root().join("client/.vite/ssr-manifest.json"), json).unwrap();
    }

    fn write_entry(&self) {
        std::fs::create_dir_all(self.root().join("server")).unwrap();
        std::fs::write(
            self.root().join("server/entry-server.js"),
            "export async function render(url, manifest) { return {}; }",
        )
        .unwrap();
    }

    fn write_dist(&self) {
        self.write_template(SHELL);
        self.write_manifest("{}");
        self.write_entry();
    }

    fn cache(&self) -> AssetCache {
        AssetCache::new(AssetLoader::new(
            ArtifactLayout::new(self.root()),
            TestModule {
                loads: self.loads.clone(),
                renders: self.renders.clone(),
            },
        ))
    }

    fn node(&self) -> NodeHandler {
        NodeHandler::new(self.cache())
    }

    fn fetch(&self) -> FetchHandler {
        FetchHandler::new(self.cache())
    }
}

async fn node_get(handler: &NodeHandler, url: &str) -> ServerResponse {
    let mut res = ServerResponse::new();
    handler.handle(&IncomingMessage::new("GET", url), &mut res).await;
    res
}

fn fetch_request(method: Method, uri: &str) -> Request<()> {
    Request::builder().method(method).uri(uri).body(()).unwrap()
}

// === End-to-end Success ===

#[tokio::test]
async fn test_node_renders_about_page() {
    let fx = Fixture::new();
    fx.write_dist();

    let res = node_get(&fx.node(), "/about?utm=x").await;

    assert_eq!(res.status_code(), 200);
    assert_eq!(res.header("Content-Type"), Some("text/html; charset=utf-8"));
    assert_eq!(
        res.header("Cache-Control"),
        Some("public, max-age=0, s-maxage=60, stale-while-revalidate=3600")
    );
    let body = res.body().unwrap();
    assert!(body.contains("<title>About</title>"));
    assert!(body.contains("<h1>About</h1>"));
    assert!(res.header("X-Request-ID").is_some());
}

#[tokio::test]
async fn test_fetch_renders_about_page() {
    let fx = Fixture::new();
    fx.write_dist();

    let response = fx
        .fetch()
        .handle(&fetch_request(Method::GET, "https://shop.example.com/about?ref=nav"))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
    assert_eq!(response.headers()["cache-control"], "public, max-age=3600");
    assert_eq!(
        response.body(),
        "<!DOCTYPE html><html><head><title>About</title></head><body><div id=\"app\"><h1>About</h1></div></body></html>"
    );
}

#[tokio::test]
async fn test_node_url_in_query_renders_own_path() {
    let fx = Fixture::new();
    fx.write_dist();

    let res = node_get(&fx.node(), "/about?next=https://example.com/broken").await;

    assert_eq!(res.status_code(), 200);
    assert!(res.body().unwrap().contains("<h1>About</h1>"));
}

#[tokio::test]
async fn test_empty_render_result_clears_placeholders() {
    let fx = Fixture::new();
    fx.write_template("<html><!--app-head--><!--app-html--></html>");
    fx.write_manifest("{}");
    fx.write_entry();

    let res = node_get(&fx.node(), "/").await;
    assert_eq!(res.body(), Some("<html></html>"));
}

#[tokio::test]
async fn test_duplicate_head_marker_kept_literal() {
    let fx = Fixture::new();
    fx.write_template("<!--app-head--><!--app-head--><!--app-html-->");
    fx.write_manifest("{}");
    fx.write_entry();

    let res = node_get(&fx.node(), "/about").await;
    assert_eq!(res.body(), Some("<title>About</title><!--app-head--><h1>About</h1>"));
}

// === Loading ===

#[tokio::test]
async fn test_assets_loaded_once_across_requests() {
    let fx = Fixture::new();
    fx.write_dist();
    let handler = fx.node();

    for _ in 0..3 {
        assert_eq!(node_get(&handler, "/about").await.status_code(), 200);
    }

    assert_eq!(fx.loads.load(Ordering::SeqCst), 1);
    assert_eq!(fx.renders.load(Ordering::SeqCst), 3);
    assert_eq!(handler.dispatcher().assets().attempts(), 1);
}

#[tokio::test]
async fn test_concurrent_first_requests_share_load() {
    let fx = Fixture::new();
    fx.write_dist();
    let handler = fx.fetch();

    let requests: Vec<_> = (0..8).map(|_| fetch_request(Method::GET, "/about")).collect();
    let responses = futures::future::join_all(requests.iter().map(|req| handler.handle(req))).await;

    assert!(responses.iter().all(|r| r.status() == StatusCode::OK));
    assert_eq!(fx.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_manifest_then_recovery() {
    let fx = Fixture::new();
    fx.write_template(SHELL);
    fx.write_manifest("{ \"src/App.tsx\": [");
    fx.write_entry();
    let handler = fx.node();

    let res = node_get(&handler, "/about").await;
    assert_eq!(res.status_code(), 500);
    assert_eq!(res.header("Cache-Control"), Some("no-store"));
    assert!(res.body().unwrap().contains("invalid SSR manifest"));
    assert_eq!(handler.dispatcher().assets().phase(), LoadPhase::LoadFailed);
    assert_eq!(fx.loads.load(Ordering::SeqCst), 0);

    fx.write_manifest("{}");
    let res = node_get(&handler, "/about").await;
    assert_eq!(res.status_code(), 200);
    assert_eq!(handler.dispatcher().assets().attempts(), 2);
}

#[tokio::test]
async fn test_missing_render_entry_is_diagnosed() {
    let fx = Fixture::new();
    fx.write_template(SHELL);
    fx.write_manifest("{}");

    let response = fx.fetch().handle(&fetch_request(Method::GET, "/")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body().contains("render entry module not found"));
}

// === Method Handling ===

#[tokio::test]
async fn test_node_rejects_post() {
    let fx = Fixture::new();
    fx.write_dist();
    let handler = fx.node();

    let mut res = ServerResponse::new();
    handler
        .handle(&IncomingMessage::new("POST", "/about"), &mut res)
        .await;

    assert_eq!(res.status_code(), 405);
    assert_eq!(res.body(), Some(r#"{"error":"Method not allowed"}"#));
    assert_eq!(fx.renders.load(Ordering::SeqCst), 0);
    assert_eq!(fx.loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fetch_method_check_is_opt_in() {
    let fx = Fixture::new();
    fx.write_dist();

    let permissive = fx.fetch();
    let response = permissive.handle(&fetch_request(Method::POST, "/about")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let strict = fx.fetch().with_method_check();
    let response = strict.handle(&fetch_request(Method::PUT, "/about")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_head_returns_headers_only() {
    let fx = Fixture::new();
    fx.write_dist();

    let response = fx.fetch().handle(&fetch_request(Method::HEAD, "/about")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.body().is_empty());
    assert_eq!(response.headers()["content-type"], "text/html; charset=utf-8");
}

// === Render Failures ===

#[tokio::test]
async fn test_render_failure_does_not_poison_cache() {
    let fx = Fixture::new();
    fx.write_dist();
    let handler = fx.node();

    let failed = node_get(&handler, "/broken").await;
    assert_eq!(failed.status_code(), 500);
    let body = failed.body().unwrap();
    assert!(body.contains("(reading &#39;&lt;script&gt;&#39;)"));
    assert!(!body.contains("'<script>'"));
    assert!(body.contains("at render (entry-server.js:12:5)"));
    assert!(body.contains("Request Method: GET"));

    let ok = node_get(&handler, "/about").await;
    assert_eq!(ok.status_code(), 200);
    assert_eq!(handler.dispatcher().assets().phase(), LoadPhase::Ready);
    assert_eq!(fx.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_render_failure_reports_earlier_load_error() {
    let fx = Fixture::new();
    fx.write_template(SHELL);
    fx.write_manifest("{}");
    let handler = fx.node();

    assert_eq!(node_get(&handler, "/").await.status_code(), 500);
    fx.write_entry();

    let res = node_get(&handler, "/broken").await;
    let body = res.body().unwrap();
    assert!(body.contains("Asset Loading Error"));
    assert!(body.contains("render entry module not found"));
}

// === Configuration ===

#[tokio::test]
async fn test_config_redacts_and_overrides_cache() {
    let fx = Fixture::new();
    fx.write_dist();
    let config: SsrConfig = toml::from_str(
        r#"
        [cache]
        scope = "private"
        max_age = 30

        [diagnostics]
        disclosure = "redacted"
        "#,
    )
    .unwrap();
    assert_eq!(config.diagnostics.disclosure, DiagnosticsDisclosure::Redacted);

    let handler = fx.node().configured(&config);

    let ok = node_get(&handler, "/about").await;
    assert_eq!(ok.header("Cache-Control"), Some("private, max-age=30"));

    let failed = node_get(&handler, "/broken").await;
    assert_eq!(failed.status_code(), 500);
    assert!(!failed.body().unwrap().contains("entry-server.js"));
}
