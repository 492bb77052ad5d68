//! Loading the render entry module into a [`Renderer`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{AssetLoadError, Renderer};

/// Turns the render entry artifact into a callable renderer.
#[async_trait]
pub trait RenderModuleLoader: Send + Sync {
    /// Load the module at `entry`. Fails if it is absent, cannot be loaded,
    /// or does not export a render function.
    async fn load(&self, entry: &Path) -> Result<Arc<dyn Renderer>, AssetLoadError>;
}

/// Hands out a fixed renderer. Used for embedding and tests.
#[derive(Clone)]
pub struct StaticModuleLoader {
    renderer: Arc<dyn Renderer>,
    require_file: bool,
}

impl StaticModuleLoader {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            require_file: false,
        }
    }

    /// Fail with `RenderModuleMissing` unless the entry file exists on disk.
    pub fn require_file(mut self) -> Self {
        self.require_file = true;
        self
    }
}

#[async_trait]
impl RenderModuleLoader for StaticModuleLoader {
    async fn load(&self, entry: &Path) -> Result<Arc<dyn Renderer>, AssetLoadError> {
        if self.require_file && tokio::fs::metadata(entry).await.is_err() {
            return Err(AssetLoadError::RenderModuleMissing {
                path: entry.to_path_buf(),
            });
        }
        Ok(self.renderer.clone())
    }
}
