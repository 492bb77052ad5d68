//! Asset loading errors.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// A required build artifact is missing, unreadable, or malformed.
#[derive(Error, Debug)]
pub enum AssetLoadError {
    /// The HTML shell could not be read.
    #[error("failed to read HTML template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The SSR manifest could not be read.
    #[error("failed to read SSR manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The SSR manifest is not a JSON object.
    #[error("invalid SSR manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// The render entry module does not exist.
    #[error("render entry module not found: {}", path.display())]
    RenderModuleMissing { path: PathBuf },

    /// The render entry module loaded but has no usable export.
    #[error("render entry module {} does not export a `{export}` function", path.display())]
    MissingExport { path: PathBuf, export: String },

    /// The render entry module failed to load.
    #[error("failed to load render entry module {}: {reason}", path.display())]
    ModuleLoad { path: PathBuf, reason: String },
}

impl AssetLoadError {
    /// The artifact path the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::TemplateRead { path, .. }
            | Self::ManifestRead { path, .. }
            | Self::InvalidManifest { path, .. }
            | Self::RenderModuleMissing { path }
            | Self::MissingExport { path, .. }
            | Self::ModuleLoad { path, .. } => path,
        }
    }

    /// Which of the three artifacts failed.
    pub fn artifact(&self) -> &'static str {
        match self {
            Self::TemplateRead { .. } => "template",
            Self::ManifestRead { .. } | Self::InvalidManifest { .. } => "manifest",
            Self::RenderModuleMissing { .. }
            | Self::MissingExport { .. }
            | Self::ModuleLoad { .. } => "render entry",
        }
    }
}
