//! The render capability exported by the render entry module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SsrManifest;

/// Fragments produced by a render call.
///
/// Either may be absent; an absent fragment substitutes as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOutput {
    /// Markup for the document head.
    pub head: Option<String>,
    /// Markup for the application body.
    pub html: Option<String>,
}

impl RenderOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = Some(head.into());
        self
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Head fragment, or empty.
    pub fn head_or_empty(&self) -> &str {
        self.head.as_deref().unwrap_or("")
    }

    /// Body fragment, or empty.
    pub fn html_or_empty(&self) -> &str {
        self.html.as_deref().unwrap_or("")
    }
}

/// A render call failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct RenderFailure {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
}

impl RenderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Renders an application path to head and body fragments.
///
/// Implementations must be safe to call concurrently; the pipeline shares one
/// renderer across all requests.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, path: &str, manifest: &SsrManifest)
        -> Result<RenderOutput, RenderFailure>;
}

/// Adapts a synchronous closure into a [`Renderer`].
pub struct FnRenderer<F> {
    f: F,
}

impl<F> FnRenderer<F>
where
    F: Fn(&str, &SsrManifest) -> Result<RenderOutput, RenderFailure> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Renderer for FnRenderer<F>
where
    F: Fn(&str, &SsrManifest) -> Result<RenderOutput, RenderFailure> + Send + Sync,
{
    async fn render(
        &self,
        path: &str,
        manifest: &SsrManifest,
    ) -> Result<RenderOutput, RenderFailure> {
        (self.f)(path, manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_missing_fields_default_to_none() {
        let output: RenderOutput = serde_json::from_str(r#"{"html":"<p>hi</p>"}"#).unwrap();
        assert_eq!(output.head, None);
        assert_eq!(output.head_or_empty(), "");
        assert_eq!(output.html_or_empty(), "<p>hi</p>");
    }

    #[test]
    fn test_output_null_fields() {
        let output: RenderOutput = serde_json::from_str(r#"{"head":null,"html":null}"#).unwrap();
        assert_eq!(output, RenderOutput::new());
    }

    #[test]
    fn test_failure_display_is_message() {
        let failure = RenderFailure::new("boom").with_stack("Error: boom\n    at render");
        assert_eq!(failure.to_string(), "boom");
        assert!(failure.stack.unwrap().starts_with("Error: boom"));
    }

    #[test]
    fn test_failure_from_json_without_stack() {
        let failure: RenderFailure = serde_json::from_str(r#"{"message":"bad"}"#).unwrap();
        assert_eq!(failure, RenderFailure::new("bad"));
    }

    #[tokio::test]
    async fn test_fn_renderer_receives_path_and_manifest() {
        let renderer = FnRenderer::new(|path: &str, manifest: &SsrManifest| {
            Ok(RenderOutput::new().with_html(format!("{path}:{}", manifest.len())))
        });
        let manifest = SsrManifest::parse(r#"{"a":[]}"#).unwrap();
        let output = renderer.render("/x", &manifest).await.unwrap();
        assert_eq!(output.html_or_empty(), "/x:1");
    }
}
