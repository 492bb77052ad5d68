//! Public SDK for the SSR bootstrap pipeline.
//!
//! This crate re-exports all pipeline functionality:
//!
//! ```ignore
//! use ssr_sdk::prelude::*;
//!
//! // Deployed as /var/task/api/ssr; build output lives in /var/task/dist.
//! let handler = NodeHandler::beside(std::env::current_exe()?, NodeModuleLoader::default());
//!
//! let mut res = ServerResponse::new();
//! handler.handle(&IncomingMessage::new("GET", "/about"), &mut res).await;
//! assert_eq!(res.status_code(), 200);
//! ```

pub use ssr_assets;
pub use ssr_cache;
pub use ssr_core;
pub use ssr_host;
pub use ssr_observability;
pub use ssr_render;

/// Prelude for convenient imports.
pub mod prelude {
    pub use ssr_assets::*;
    pub use ssr_cache::*;
    pub use ssr_core::*;
    pub use ssr_host::fetch::FetchHandler;
    pub use ssr_host::node::{IncomingMessage, NodeHandler, ServerResponse};
    pub use ssr_host::{ConfigError, SsrConfig};
    pub use ssr_observability::*;
    pub use ssr_render::*;
}
