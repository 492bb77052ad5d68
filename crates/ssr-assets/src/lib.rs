//! Build artifact loading for the SSR pipeline.
//!
//! Three artifacts are needed to answer a render request: the HTML shell,
//! the SSR manifest and the render entry module. They are loaded together,
//! all-or-nothing, and memoized for the lifetime of the process.
//!
//! This crate provides:
//! - `AssetBundle` - The loaded triple
//! - `SsrManifest` - Module id to asset URL mapping
//! - `Renderer` / `RenderModuleLoader` - The pluggable render capability
//! - `NodeModuleLoader` - Imports a built `entry-server.js` into a long-lived Node worker
//! - `AssetLoader` - Reads the artifacts from an `ArtifactLayout`
//! - `AssetCache` - Memoized, coalesced `ensure_loaded`
//!
//! # Example
//!
//! ```rust,ignore
//! use ssr_assets::{AssetCache, AssetLoader, NodeModuleLoader};
//! use ssr_core::ArtifactLayout;
//!
//! let loader = AssetLoader::new(ArtifactLayout::new("dist"), NodeModuleLoader::default());
//! let cache = AssetCache::new(loader);
//!
//! let bundle = cache.ensure_loaded().await?;
//! let output = bundle.renderer().render("/about", bundle.manifest()).await?;
//! ```

mod bundle;
mod cache;
mod error;
mod loader;
mod manifest;
mod module;
mod node;
mod renderer;

pub use bundle::*;
pub use cache::*;
pub use error::*;
pub use loader::*;
pub use manifest::*;
pub use module::*;
pub use node::*;
pub use renderer::*;
