//! Build artifact layout.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default location of the HTML shell, relative to the artifact root.
pub const DEFAULT_TEMPLATE: &str = "client/index.html";
/// Default location of the SSR manifest, relative to the artifact root.
pub const DEFAULT_MANIFEST: &str = "client/.vite/ssr-manifest.json";
/// Default location of the render entry module, relative to the artifact root.
pub const DEFAULT_RENDER_ENTRY: &str = "server/entry-server.js";

/// Marker in the HTML shell replaced by the rendered head fragment.
pub const HEAD_PLACEHOLDER: &str = "<!--app-head-->";
/// Marker in the HTML shell replaced by the rendered body fragment.
pub const BODY_PLACEHOLDER: &str = "<!--app-html-->";

/// Where the three build artifacts live.
///
/// The artifact root is the build output directory; the three artifact
/// paths are relative to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactLayout {
    /// Build output root (e.g. `dist/`).
    pub root: PathBuf,
    /// HTML shell, relative to `root`.
    #[serde(default = "default_template")]
    pub template: PathBuf,
    /// SSR manifest, relative to `root`.
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    /// Render entry module, relative to `root`.
    #[serde(default = "default_render_entry")]
    pub render_entry: PathBuf,
}

fn default_template() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATE)
}

fn default_manifest() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST)
}

fn default_render_entry() -> PathBuf {
    PathBuf::from(DEFAULT_RENDER_ENTRY)
}

impl ArtifactLayout {
    /// Create a layout with the default artifact paths under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            template: default_template(),
            manifest: default_manifest(),
            render_entry: default_render_entry(),
        }
    }

    /// Derive the root from the deployment's own file location.
    ///
    /// `offset` is resolved against the directory containing `deployment_file`,
    /// so `beside("/var/task/api/ssr", "../dist")` yields `/var/task/dist`.
    pub fn beside(deployment_file: impl AsRef<Path>, offset: impl AsRef<Path>) -> Self {
        let dir = deployment_file
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(normalize(&dir.join(offset)))
    }

    /// Override the HTML shell location.
    pub fn with_template(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = path.into();
        self
    }

    /// Override the manifest location.
    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = path.into();
        self
    }

    /// Override the render entry location.
    pub fn with_render_entry(mut self, path: impl Into<PathBuf>) -> Self {
        self.render_entry = path.into();
        self
    }

    /// Absolute path of the HTML shell.
    pub fn template_path(&self) -> PathBuf {
        self.root.join(&self.template)
    }

    /// Absolute path of the manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest)
    }

    /// Absolute path of the render entry module.
    pub fn render_entry_path(&self) -> PathBuf {
        self.root.join(&self.render_entry)
    }
}

/// Lexically resolve `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
