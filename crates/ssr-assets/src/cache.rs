//! Process-wide memoization of the asset bundle.
//!
//! The first caller starts a load; callers arriving while it is in flight
//! await the same attempt. A successful bundle is kept for the life of the
//! process. A failed attempt leaves the cache empty so the next caller
//! retries, and its error is kept for diagnostics.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use ssr_core::{ArtifactLayout, LoadPhase};

use crate::{AssetBundle, AssetLoadError, AssetLoader};

/// Outcome of one load attempt, shared by every caller that awaited it.
pub type LoadResult = Result<Arc<AssetBundle>, Arc<AssetLoadError>>;

type SharedLoad = Shared<BoxFuture<'static, LoadResult>>;

enum Slot {
    Empty,
    Loading(SharedLoad),
    Ready(Arc<AssetBundle>),
}

struct CacheState {
    slot: Slot,
    last_error: Option<Arc<AssetLoadError>>,
    last_attempt_failed: bool,
    attempts: u64,
}

/// Memoized, coalesced access to the [`AssetBundle`].
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct AssetCache {
    loader: Arc<AssetLoader>,
    state: Arc<Mutex<CacheState>>,
}

impl AssetCache {
    pub fn new(loader: AssetLoader) -> Self {
        Self {
            loader: Arc::new(loader),
            state: Arc::new(Mutex::new(CacheState {
                slot: Slot::Empty,
                last_error: None,
                last_attempt_failed: false,
                attempts: 0,
            })),
        }
    }

    /// Return the cached bundle, loading it first if needed.
    ///
    /// Concurrent callers during a load share that load's outcome. After a
    /// success no further I/O happens.
    pub async fn ensure_loaded(&self) -> LoadResult {
        let load = {
            let mut state = lock(&self.state);
            match &state.slot {
                Slot::Ready(bundle) => return Ok(bundle.clone()),
                Slot::Loading(load) => load.clone(),
                Slot::Empty => {
                    state.attempts += 1;
                    let load = self.start_load();
                    state.slot = Slot::Loading(load.clone());
                    load
                }
            }
        };
        load.await
    }

    /// Load eagerly, e.g. at process start.
    pub async fn preload(&self) -> Result<(), Arc<AssetLoadError>> {
        self.ensure_loaded().await.map(|_| ())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LoadPhase {
        let state = lock(&self.state);
        match state.slot {
            Slot::Ready(_) => LoadPhase::Ready,
            Slot::Loading(_) => LoadPhase::Loading,
            Slot::Empty if state.last_attempt_failed => LoadPhase::LoadFailed,
            Slot::Empty => LoadPhase::Unloaded,
        }
    }

    /// The most recent load failure, if any. Kept after a later success.
    pub fn last_load_error(&self) -> Option<Arc<AssetLoadError>> {
        lock(&self.state).last_error.clone()
    }

    /// Number of load attempts started.
    pub fn attempts(&self) -> u64 {
        lock(&self.state).attempts
    }

    pub fn layout(&self) -> &ArtifactLayout {
        self.loader.layout()
    }

    fn start_load(&self) -> SharedLoad {
        let loader = self.loader.clone();
        let state = self.state.clone();
        async move {
            let result = loader.load().await.map(Arc::new).map_err(Arc::new);
            settle(&state, &result);
            result
        }
        .boxed()
        .shared()
    }
}

fn settle(state: &Mutex<CacheState>, result: &LoadResult) {
    let mut state = lock(state);
    match result {
        Ok(bundle) => {
            state.slot = Slot::Ready(bundle.clone());
            state.last_attempt_failed = false;
        }
        Err(err) => {
            tracing::error!(error = %err, artifact = err.artifact(), "asset load failed");
            state.slot = Slot::Empty;
            state.last_error = Some(err.clone());
            state.last_attempt_failed = true;
        }
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::{FnRenderer, RenderModuleLoader, RenderOutput, Renderer, SsrManifest};

    /// Counts module loads and holds each one open briefly so that
    /// concurrent callers overlap.
    struct CountingLoader {
        loads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RenderModuleLoader for CountingLoader {
        async fn load(&self, _entry: &Path) -> Result<Arc<dyn Renderer>, AssetLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(Arc::new(FnRenderer::new(|path: &str, _: &SsrManifest| {
                Ok(RenderOutput::new().with_html(path.to_string()))
            })))
        }
    }

    fn write_dist(root: &Path, manifest: &str) {
        std::fs::create_dir_all(root.join("client/.vite")).unwrap();
        std::fs::write(
            root.join("client/index.html"),
            "<head><!--app-head--></head><div id=\"app\"><!--app-html--></div>",
        )
        .unwrap();
        std::fs::write(root.join("client/.vite/ssr-manifest.json"), manifest).unwrap();
    }

    fn cache(root: &Path) -> (AssetCache, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let loader = AssetLoader::new(
            ArtifactLayout::new(root),
            CountingLoader {
                loads: loads.clone(),
            },
        );
        (AssetCache::new(loader), loads)
    }

    // === Memoization Tests ===

    #[tokio::test]
    async fn test_starts_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path());
        assert_eq!(cache.phase(), LoadPhase::Unloaded);
        assert_eq!(cache.attempts(), 0);
        assert!(cache.last_load_error().is_none());
    }

    #[tokio::test]
    async fn test_second_call_returns_same_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_dist(dir.path(), "{}");
        let (cache, loads) = cache(dir.path());

        let first = cache.ensure_loaded().await.unwrap();
        let second = cache.ensure_loaded().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.attempts(), 1);
        assert_eq!(cache.phase(), LoadPhase::Ready);
    }

    #[tokio::test]
    async fn test_ready_survives_artifact_deletion() {
        let dir = tempfile::tempdir().unwrap();
        write_dist(dir.path(), "{}");
        let (cache, _) = cache(dir.path());

        cache.preload().await.unwrap();
        std::fs::remove_file(dir.path().join("client/index.html")).unwrap();

        assert!(cache.ensure_loaded().await.is_ok());
    }

    // === Concurrency Tests ===

    #[tokio::test]
    async fn test_concurrent_first_calls_share_one_load() {
        let dir = tempfile::tempdir().unwrap();
        write_dist(dir.path(), "{}");
        let (cache, loads) = cache(dir.path());

        let results =
            futures::future::join_all((0..16).map(|_| cache.ensure_loaded())).await;

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.attempts(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_dist(dir.path(), "not json");
        let (cache, _) = cache(dir.path());

        let results = futures::future::join_all((0..4).map(|_| cache.ensure_loaded())).await;

        assert_eq!(cache.attempts(), 1);
        let first = results[0].as_ref().unwrap_err();
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap_err()));
        }
    }

    // === Failure and Retry Tests ===

    #[tokio::test]
    async fn test_failed_load_caches_nothing_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        write_dist(dir.path(), "{ malformed");
        let (cache, loads) = cache(dir.path());

        let err = cache.ensure_loaded().await.unwrap_err();
        assert!(matches!(*err, AssetLoadError::InvalidManifest { .. }));
        assert_eq!(cache.phase(), LoadPhase::LoadFailed);
        // Manifest failed, so the render entry was never loaded.
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        write_dist(dir.path(), r#"{"src/App.tsx":["/assets/App.js"]}"#);
        let bundle = cache.ensure_loaded().await.unwrap();

        assert_eq!(bundle.manifest().len(), 1);
        assert_eq!(cache.attempts(), 2);
        assert_eq!(cache.phase(), LoadPhase::Ready);
    }

    #[tokio::test]
    async fn test_last_error_retained_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _) = cache(dir.path());

        assert!(cache.ensure_loaded().await.is_err());
        write_dist(dir.path(), "{}");
        assert!(cache.ensure_loaded().await.is_ok());

        let last = cache.last_load_error().unwrap();
        assert!(matches!(*last, AssetLoadError::TemplateRead { .. }));
    }
}
