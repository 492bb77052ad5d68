//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use ssr_assets::{AssetCache, AssetLoader};
use ssr_core::ArtifactLayout;
use ssr_host::{FetchHandler, NodeHandler, SsrConfig};

use crate::commands::Adapter;
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    /// Loaded configuration (defaults when no file was found).
    pub config: SsrConfig,
    /// Where the configuration came from.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
    /// `--dist` override.
    dist: Option<PathBuf>,
}

impl Context {
    /// Load context, from an explicit config file or the nearest one found.
    pub fn load(config_path: Option<&Path>, dist: Option<PathBuf>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config_path, config) = match config_path {
            Some(path) => {
                let config = SsrConfig::load(path)
                    .with_context(|| format!("Failed to load config file: {}", path.display()))?;
                (Some(path.to_path_buf()), config)
            }
            None => match SsrConfig::discover(&cwd)? {
                Some((path, config)) => (Some(path), config),
                None => (None, SsrConfig::default()),
            },
        };

        if let Some(path) = &config_path {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
            dist,
        })
    }

    /// Artifact layout: `--dist`, else config, else `./dist`.
    pub fn layout(&self) -> ArtifactLayout {
        let mut layout = self.config.layout(ArtifactLayout::new(self.cwd.join("dist")));
        if let Some(dist) = &self.dist {
            layout.root = self.resolve_path(dist);
        }
        layout
    }

    /// A fresh asset cache over the resolved layout.
    pub fn asset_cache(&self) -> AssetCache {
        AssetCache::new(AssetLoader::with_module_loader(
            self.layout(),
            self.config.module_loader(),
        ))
    }

    /// Build the requested host adapter.
    pub fn handler(&self, adapter: Adapter) -> HostHandler {
        match adapter {
            Adapter::Node => {
                HostHandler::Node(NodeHandler::new(self.asset_cache()).configured(&self.config))
            }
            Adapter::Fetch => {
                HostHandler::Fetch(FetchHandler::new(self.asset_cache()).configured(&self.config))
            }
        }
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// One of the two host adapters.
#[derive(Clone)]
pub enum HostHandler {
    Node(NodeHandler),
    Fetch(FetchHandler),
}

impl HostHandler {
    pub fn assets(&self) -> &AssetCache {
        match self {
            Self::Node(handler) => handler.dispatcher().assets(),
            Self::Fetch(handler) => handler.dispatcher().assets(),
        }
    }
}
