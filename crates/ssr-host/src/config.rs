//! File configuration for the host adapters.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ssr_assets::{AssetCache, AssetLoader, NodeModuleLoader, RenderModuleLoader};
use ssr_cache::RouteCachePolicy;
use ssr_core::ArtifactLayout;
use ssr_observability::{LogFormat, LogLevel};
use ssr_render::{DiagnosticsDisclosure, MethodPolicy, RenderDispatcher};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// File names searched for, in order, in each directory.
pub const CONFIG_FILE_NAMES: &[&str] = &["ssr.toml", ".ssr.toml", "ssr.json"];

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML config {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON config {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings shared by every host adapter.
///
/// Every field is optional; anything left out keeps the adapter's default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsrConfig {
    /// Where the build artifacts live.
    pub artifacts: ArtifactsConfig,

    /// Cache policy for successful pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<RouteCachePolicy>,

    /// Diagnostic page settings.
    pub diagnostics: DiagnosticsConfig,

    /// Render entry execution.
    pub renderer: RendererConfig,

    /// Request log output.
    pub logging: LoggingConfig,

    /// Reject non-read methods with 405.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce_read_methods: Option<bool>,
}

/// Artifact location overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Build output root. Relative paths resolve against the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_entry: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub disclosure: DiagnosticsDisclosure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Node.js binary used to run the render entry.
    pub node_binary: PathBuf,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: LogLevel::Info,
        }
    }
}

impl SsrConfig {
    /// Load config from a file; `.json` files are JSON, anything else TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?
        };

        if let (Some(root), Some(dir)) = (&config.artifacts.root, path.parent()) {
            if root.is_relative() {
                config.artifacts.root = Some(dir.join(root));
            }
        }
        Ok(config)
    }

    /// Find and load the nearest config file, walking up from `start`.
    ///
    /// Returns `Ok(None)` when no config file exists anywhere up the tree.
    pub fn discover(start: impl AsRef<Path>) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        for dir in start.as_ref().ancestors() {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    let config = Self::load(&candidate)?;
                    return Ok(Some((candidate, config)));
                }
            }
        }
        Ok(None)
    }

    /// Apply artifact overrides on top of an adapter's default layout.
    pub fn layout(&self, default: ArtifactLayout) -> ArtifactLayout {
        let artifacts = &self.artifacts;
        let mut layout = match &artifacts.root {
            Some(root) => ArtifactLayout {
                root: root.clone(),
                ..default
            },
            None => default,
        };
        if let Some(template) = &artifacts.template {
            layout = layout.with_template(template);
        }
        if let Some(manifest) = &artifacts.manifest {
            layout = layout.with_manifest(manifest);
        }
        if let Some(render_entry) = &artifacts.render_entry {
            layout = layout.with_render_entry(render_entry);
        }
        layout
    }

    /// The render module loader this config asks for.
    pub fn module_loader(&self) -> Arc<dyn RenderModuleLoader> {
        Arc::new(NodeModuleLoader::new(&self.renderer.node_binary))
    }

    /// An asset cache over the configured layout and Node loader.
    pub fn asset_cache(&self, default: ArtifactLayout) -> AssetCache {
        AssetCache::new(AssetLoader::with_module_loader(
            self.layout(default),
            self.module_loader(),
        ))
    }

    /// Apply the configured overrides to an adapter's dispatcher.
    pub fn configure(&self, dispatcher: RenderDispatcher) -> RenderDispatcher {
        let mut dispatcher = dispatcher
            .with_disclosure(self.diagnostics.disclosure)
            .with_log_format(self.logging.format)
            .with_min_level(self.logging.level);
        if let Some(policy) = &self.cache {
            dispatcher = dispatcher.with_cache_policy(policy.clone());
        }
        if let Some(enforce) = self.enforce_read_methods {
            dispatcher = dispatcher.with_method_policy(if enforce {
                MethodPolicy::ReadOnly
            } else {
                MethodPolicy::Any
            });
        }
        dispatcher
    }

    /// Install a global `tracing` subscriber on stderr for process-level
    /// events such as artifact loading and worker restarts.
    ///
    /// Level and format follow `[logging]`; `RUST_LOG` overrides the level.
    /// Returns `false` when the embedder already installed a subscriber.
    pub fn init_tracing(&self) -> bool {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(tracing_directive(self.logging.level)));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false);
        match self.logging.format {
            LogFormat::Json => builder.json().try_init().is_ok(),
            LogFormat::Human => builder.try_init().is_ok(),
        }
    }
}

fn tracing_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

/// A commented starter `ssr.toml`.
pub fn generate_default_config() -> String {
    r#"# SSR bootstrap configuration

# Reject methods other than GET and HEAD with 405.
# enforce_read_methods = true

[artifacts]
# root = "dist"
# template = "client/index.html"
# manifest = "client/.vite/ssr-manifest.json"
# render_entry = "server/entry-server.js"

# [cache]
# scope = "public"
# max_age = 0
# s_maxage = 60
# stale_while_revalidate = 3600

[diagnostics]
# "full" shows error detail on 500 pages; "redacted" shows only the request id
disclosure = "full"

[renderer]
node_binary = "node"

[logging]
format = "json"
level = "info"
"#
    .to_string()
}
