//! Reads the build artifacts from disk.

use std::sync::Arc;

use ssr_core::{ArtifactLayout, BODY_PLACEHOLDER, HEAD_PLACEHOLDER};
use tracing::{info, warn};

use crate::{AssetBundle, AssetLoadError, RenderModuleLoader, SsrManifest};

/// Loads the template, manifest and render entry for one [`ArtifactLayout`].
///
/// Each call performs a full load; memoization lives in [`crate::AssetCache`].
pub struct AssetLoader {
    layout: ArtifactLayout,
    modules: Arc<dyn RenderModuleLoader>,
}

impl AssetLoader {
    pub fn new(layout: ArtifactLayout, modules: impl RenderModuleLoader + 'static) -> Self {
        Self::with_module_loader(layout, Arc::new(modules))
    }

    pub fn with_module_loader(layout: ArtifactLayout, modules: Arc<dyn RenderModuleLoader>) -> Self {
        Self { layout, modules }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Load all three artifacts in order: template, manifest, render entry.
    /// The first failure aborts the load and nothing is returned.
    pub async fn load(&self) -> Result<AssetBundle, AssetLoadError> {
        let template_path = self.layout.template_path();
        let template_html = tokio::fs::read_to_string(&template_path)
            .await
            .map_err(|source| AssetLoadError::TemplateRead {
                path: template_path.clone(),
                source,
            })?;
        info!(path = %template_path.display(), bytes = template_html.len(), "loaded HTML template");

        let manifest_path = self.layout.manifest_path();
        let manifest_text = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|source| AssetLoadError::ManifestRead {
                path: manifest_path.clone(),
                source,
            })?;
        let manifest =
            SsrManifest::parse(&manifest_text).map_err(|reason| AssetLoadError::InvalidManifest {
                path: manifest_path.clone(),
                reason,
            })?;
        info!(path = %manifest_path.display(), modules = manifest.len(), "loaded SSR manifest");

        let entry_path = self.layout.render_entry_path();
        let renderer = self.modules.load(&entry_path).await?;
        info!(path = %entry_path.display(), "loaded render entry");

        for placeholder in [HEAD_PLACEHOLDER, BODY_PLACEHOLDER] {
            if !template_html.contains(placeholder) {
                warn!(
                    path = %template_path.display(),
                    placeholder,
                    "HTML template has no placeholder; rendered fragment will be dropped"
                );
            }
        }

        Ok(AssetBundle::new(template_html, manifest, renderer))
    }
}
