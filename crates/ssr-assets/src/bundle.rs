use std::fmt;
use std::sync::Arc;

use crate::{Renderer, SsrManifest};

/// The three loaded build artifacts. Immutable once built.
#[derive(Clone)]
pub struct AssetBundle {
    template_html: String,
    manifest: SsrManifest,
    renderer: Arc<dyn Renderer>,
}

impl AssetBundle {
    pub fn new(
        template_html: impl Into<String>,
        manifest: SsrManifest,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            template_html: template_html.into(),
            manifest,
            renderer,
        }
    }

    /// The HTML shell, verbatim.
    pub fn template_html(&self) -> &str {
        &self.template_html
    }

    pub fn manifest(&self) -> &SsrManifest {
        &self.manifest
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }
}

impl fmt::Debug for AssetBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetBundle")
            .field("template_bytes", &self.template_html.len())
            .field("manifest_modules", &self.manifest.len())
            .finish_non_exhaustive()
    }
}
