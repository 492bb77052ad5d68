//! Pipeline errors.

use std::sync::Arc;

use ssr_assets::{AssetLoadError, RenderFailure};
use ssr_core::RequestMethod;
use thiserror::Error;

/// Why a request did not produce a rendered page.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// Non-read method; never reaches the renderer.
    #[error("method {0} not allowed")]
    MethodNotAllowed(RequestMethod),

    /// The asset bundle could not be loaded.
    #[error(transparent)]
    AssetLoad(#[from] Arc<AssetLoadError>),

    /// The render function failed for this request.
    #[error(transparent)]
    Render(#[from] RenderFailure),
}

impl PipelineError {
    /// HTTP status the error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Self::MethodNotAllowed(_) => 405,
            Self::AssetLoad(_) | Self::Render(_) => 500,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::AssetLoad(_) => "asset_load",
            Self::Render(_) => "render",
        }
    }
}
