//! Host adapters for the SSR render pipeline.
//!
//! Both adapters are thin translations around one `RenderDispatcher`:
//! - `node` - `IncomingMessage` / `ServerResponse` handlers (serverless Node style)
//! - `fetch` - `http::Request` to `http::Response` handlers (edge Fetch style)
//!
//! `SsrConfig` carries the file-based settings both of them accept.
//!
//! Per-request lines go through `StructuredLogger`. Process-level events from
//! the asset cache and render worker use `tracing`; `from_config` installs a
//! stderr subscriber for them, and embedders building handlers with `new`
//! should call `SsrConfig::init_tracing` or install their own.

mod config;
pub mod fetch;
pub mod node;

pub use config::*;
pub use fetch::FetchHandler;
pub use node::{IncomingMessage, NodeHandler, ServerResponse};

use ssr_core::{RequestContext, RequestId, RequestMethod};

/// Header a platform may use to hand us its own request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the pipeline's context from the pieces every host request has.
pub(crate) fn request_context(
    method: &str,
    url: &str,
    headers: Vec<(String, String)>,
) -> RequestContext {
    let ctx = RequestContext::new(RequestMethod::parse(method), url).with_headers(headers);
    match ctx.header(REQUEST_ID_HEADER).map(str::to_string) {
        Some(id) if !id.is_empty() => ctx.with_request_id(RequestId::from_string(id)),
        _ => ctx,
    }
}
