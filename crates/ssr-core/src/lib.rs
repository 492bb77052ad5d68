//! Core abstractions for the SSR bootstrap pipeline.
//!
//! This crate provides the host-neutral types every other crate speaks:
//! - `RequestContext` - Per-request method, URL, path and failure timestamp
//! - `ResponseSpec` - Host-neutral response (status, headers, body)
//! - `ArtifactLayout` - Where the three build artifacts live
//! - `LoadPhase` - Asset bundle lifecycle

mod config;
mod context;
mod lifecycle;
mod response;

pub use config::*;
pub use context::*;
pub use lifecycle::*;
pub use response::*;
