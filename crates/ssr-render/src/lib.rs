//! The render pipeline.
//!
//! This crate turns a host-neutral `RequestContext` into a `ResponseSpec`:
//! - `ShellTemplate` - Single-pass placeholder substitution
//! - `RenderDispatcher` - Method check, asset load, render, response
//! - `DiagnosticPage` - Self-contained 500 page for load and render failures
//! - `PipelineError` - Everything that can stop a request

mod diagnostics;
mod dispatcher;
mod error;
mod shell;

pub use diagnostics::*;
pub use dispatcher::*;
pub use error::*;
pub use shell::*;
