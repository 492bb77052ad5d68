//! Diagnostic error page.
//!
//! Every 500 from the pipeline is a complete HTML document with no external
//! resources. It carries the error, where it came from and what to check,
//! so an operator can debug a deploy from the browser alone.

use std::error::Error as _;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ssr_assets::AssetLoadError;
use ssr_core::{iso_timestamp, RequestContext, ResponseSpec};

use crate::PipelineError;

const NO_STACK: &str = "No stack trace available";
const REDACTED_MESSAGE: &str = "The page could not be rendered. Quote the request ID when reporting this error.";

const COMMON_CAUSES: &[&str] = &[
    "Build output is missing (dist/client or dist/server)",
    "The SSR manifest was not generated or is not a JSON object",
    "The server render function threw an error",
    "The artifact root resolved to the wrong directory",
    "Dependencies of the render entry are missing or incompatible",
];

const DEBUG_STEPS: &[&str] = &[
    "Check the function logs for this request ID",
    "Run the production build locally and confirm it succeeds",
    "Run <code>ssr check</code> against the build output",
    "Confirm dist/client and dist/server both exist",
    "Verify the render entry exports a <code>render</code> function",
];

/// How much error detail a diagnostic page reveals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsDisclosure {
    /// Message, stack trace, prior load error and remediation guidance.
    #[default]
    Full,
    /// Generic message plus request ID and time only.
    Redacted,
}

/// A rendered-on-demand 500 page.
#[derive(Debug, Clone)]
pub struct DiagnosticPage {
    message: String,
    stack: Option<String>,
    prior_load_error: Option<String>,
    url: String,
    path: String,
    method: String,
    request_id: String,
    failed_at: DateTime<Utc>,
    disclosure: DiagnosticsDisclosure,
}

impl DiagnosticPage {
    /// Build the page for `error`.
    ///
    /// `prior_load_error` is only shown for render failures: a load failure
    /// is already the headline error.
    pub fn new(
        error: &PipelineError,
        ctx: &RequestContext,
        prior_load_error: Option<&AssetLoadError>,
    ) -> Self {
        let prior_load_error = match error {
            PipelineError::Render(_) => prior_load_error.map(ToString::to_string),
            _ => None,
        };
        Self {
            message: error.to_string(),
            stack: stack_trace(error),
            prior_load_error,
            url: ctx.url.clone(),
            path: ctx.path.clone(),
            method: ctx.method.to_string(),
            request_id: ctx.request_id.to_string(),
            failed_at: Utc::now(),
            disclosure: DiagnosticsDisclosure::Full,
        }
    }

    pub fn with_disclosure(mut self, disclosure: DiagnosticsDisclosure) -> Self {
        self.disclosure = disclosure;
        self
    }

    /// Override the failure instant.
    pub fn failed_at(mut self, at: DateTime<Utc>) -> Self {
        self.failed_at = at;
        self
    }

    pub fn to_html(&self) -> String {
        let mut sections = String::new();

        match self.disclosure {
            DiagnosticsDisclosure::Full => {
                push_section(&mut sections, "Error Message", &escape_html(&self.message));
                push_section(
                    &mut sections,
                    "Stack Trace",
                    &escape_html(self.stack.as_deref().unwrap_or(NO_STACK)),
                );
                if let Some(prior) = &self.prior_load_error {
                    push_section(&mut sections, "Asset Loading Error", &escape_html(prior));
                }
                push_section(
                    &mut sections,
                    "Debug Info",
                    &format!(
                        "Request URL: {}\nPath: {}\nRequest Method: {}\nTime: {}\nRequest ID: {}",
                        escape_html(&self.url),
                        escape_html(&self.path),
                        escape_html(&self.method),
                        iso_timestamp(&self.failed_at),
                        escape_html(&self.request_id),
                    ),
                );
                sections.push_str(&remediation());
            }
            DiagnosticsDisclosure::Redacted => {
                push_section(&mut sections, "Error Message", REDACTED_MESSAGE);
                push_section(
                    &mut sections,
                    "Debug Info",
                    &format!(
                        "Time: {}\nRequest ID: {}",
                        iso_timestamp(&self.failed_at),
                        escape_html(&self.request_id),
                    ),
                );
            }
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Server Error</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #f4f4f7; margin: 0; padding: 24px; }}
.container {{ background: #fff; max-width: 800px; margin: 0 auto; padding: 32px; border-radius: 8px; box-shadow: 0 8px 24px rgba(0, 0, 0, 0.12); }}
h1 {{ color: #c62828; font-size: 26px; margin: 0 0 8px; }}
.subtitle {{ color: #666; font-size: 14px; margin: 0 0 24px; }}
.section {{ margin: 20px 0; padding: 16px; background: #f7f7f7; border-left: 4px solid #1e88e5; }}
.section-title {{ font-weight: 600; color: #1565c0; font-size: 13px; text-transform: uppercase; margin-bottom: 8px; }}
.section-content {{ font-family: "SF Mono", Menlo, monospace; font-size: 12px; white-space: pre-wrap; word-wrap: break-word; background: #fff; padding: 12px; }}
.checklist li {{ color: #555; font-size: 13px; padding: 4px 0; }}
.footer {{ margin-top: 24px; padding-top: 16px; border-top: 1px solid #ddd; color: #777; font-size: 12px; }}
</style>
</head>
<body>
<div class="container">
<h1>Server Error 500</h1>
<p class="subtitle">Something went wrong during server-side rendering</p>
{sections}</div>
</body>
</html>
"#
        )
    }

    /// The page as a 500 response. Never cacheable.
    pub fn into_response(self) -> ResponseSpec {
        ResponseSpec::html(500, self.to_html()).with_header("Cache-Control", "no-store")
    }
}

fn push_section(out: &mut String, title: &str, content: &str) {
    let _ = write!(
        out,
        "<div class=\"section\">\n<div class=\"section-title\">{title}</div>\n<div class=\"section-content\">{content}</div>\n</div>\n"
    );
}

fn remediation() -> String {
    let causes: String = COMMON_CAUSES
        .iter()
        .map(|cause| format!("<li>{cause}</li>\n"))
        .collect();
    let steps: String = DEBUG_STEPS
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {step}<br>\n", i + 1))
        .collect();
    format!(
        "<div class=\"section\">\n<div class=\"section-title\">Common Causes</div>\n<ul class=\"checklist\">\n{causes}</ul>\n</div>\n<div class=\"footer\">\n<p><strong>How to debug:</strong></p>\n<p>{steps}</p>\n</div>\n"
    )
}

/// Stack text for an error: the render function's own stack if it supplied
/// one, otherwise the error's source chain.
pub fn stack_trace(error: &PipelineError) -> Option<String> {
    match error {
        PipelineError::Render(failure) => failure.stack.clone(),
        PipelineError::AssetLoad(err) => {
            let mut source = err.source();
            if source.is_none() {
                return None;
            }
            let mut text = err.to_string();
            while let Some(cause) = source {
                let _ = write!(text, "\nCaused by: {cause}");
                source = cause.source();
            }
            Some(text)
        }
        PipelineError::MethodNotAllowed(_) => None,
    }
}

/// HTML escape to prevent XSS.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use ssr_assets::RenderFailure;
    use ssr_core::RequestMethod;

    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::new(RequestMethod::Get, "/about?tab=team")
    }

    fn template_missing() -> AssetLoadError {
        AssetLoadError::TemplateRead {
            path: "dist/client/index.html".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        }
    }

    // === Escaping Tests ===

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x" & 'y')</script>"#),
            "&lt;script&gt;alert(&quot;x&quot; &amp; &#39;y&#39;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_message_is_escaped() {
        let error = PipelineError::from(RenderFailure::new("<script>alert(1)</script>"));
        let html = DiagnosticPage::new(&error, &ctx(), None).to_html();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>alert(1)"));
    }

    #[test]
    fn test_request_metadata_is_escaped() {
        let ctx = RequestContext::new(RequestMethod::Get, "/<img src=x onerror=alert(1)>");
        let error = PipelineError::from(RenderFailure::new("boom"));
        let html = DiagnosticPage::new(&error, &ctx, None).to_html();
        assert!(html.contains("Request URL: /&lt;img src=x onerror=alert(1)&gt;"));
        assert!(!html.contains("<img"));
    }

    // === Section Tests ===

    #[test]
    fn test_full_page_sections() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 15).unwrap();
        let error = PipelineError::from(
            RenderFailure::new("boom").with_stack("Error: boom\n    at render (entry-server.js:3:9)"),
        );
        let ctx = ctx();
        let html = DiagnosticPage::new(&error, &ctx, None).failed_at(at).to_html();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Error Message"));
        assert!(html.contains("at render (entry-server.js:3:9)"));
        assert!(html.contains("Request URL: /about?tab=team"));
        assert!(html.contains("Path: /about"));
        assert!(html.contains("Request Method: GET"));
        assert!(html.contains("Time: 2024-05-01T12:30:15.000Z"));
        assert!(html.contains(&format!("Request ID: {}", ctx.request_id)));
        assert!(html.contains("Common Causes"));
        assert!(html.contains("How to debug:"));
        assert!(!html.contains("Asset Loading Error"));
    }

    #[test]
    fn test_missing_stack_placeholder() {
        let error = PipelineError::from(RenderFailure::new("boom"));
        let html = DiagnosticPage::new(&error, &ctx(), None).to_html();
        assert!(html.contains(NO_STACK));
    }

    #[test]
    fn test_load_error_stack_is_source_chain() {
        let error = PipelineError::from(Arc::new(template_missing()));
        assert_eq!(
            stack_trace(&error).unwrap(),
            "failed to read HTML template dist/client/index.html: No such file or directory\n\
             Caused by: No such file or directory"
        );
    }

    #[test]
    fn test_prior_load_error_shown_for_render_failure() {
        let prior = template_missing();
        let error = PipelineError::from(RenderFailure::new("boom"));
        let html = DiagnosticPage::new(&error, &ctx(), Some(&prior)).to_html();
        assert!(html.contains("Asset Loading Error"));
        assert!(html.contains("failed to read HTML template dist/client/index.html"));
    }

    #[test]
    fn test_prior_load_error_hidden_for_load_failure() {
        let prior = template_missing();
        let error = PipelineError::from(Arc::new(template_missing()));
        let html = DiagnosticPage::new(&error, &ctx(), Some(&prior)).to_html();
        assert!(!html.contains("Asset Loading Error"));
    }

    // === Disclosure Tests ===

    #[test]
    fn test_redacted_page_hides_detail() {
        let prior = template_missing();
        let error = PipelineError::from(
            RenderFailure::new("db password is hunter2").with_stack("Error\n    at secret.js:1:1"),
        );
        let ctx = ctx();
        let html = DiagnosticPage::new(&error, &ctx, Some(&prior))
            .with_disclosure(DiagnosticsDisclosure::Redacted)
            .to_html();

        assert!(!html.contains("hunter2"));
        assert!(!html.contains("secret.js"));
        assert!(!html.contains("Asset Loading Error"));
        assert!(!html.contains("/about"));
        assert!(html.contains(REDACTED_MESSAGE));
        assert!(html.contains(&format!("Request ID: {}", ctx.request_id)));
    }

    #[test]
    fn test_into_response() {
        let error = PipelineError::from(RenderFailure::new("boom"));
        let response = DiagnosticPage::new(&error, &ctx(), None).into_response();
        assert_eq!(response.status, 500);
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(response.header("cache-control"), Some("no-store"));
    }

    #[test]
    fn test_disclosure_from_config_value() {
        let d: DiagnosticsDisclosure = serde_json::from_str(r#""redacted""#).unwrap();
        assert_eq!(d, DiagnosticsDisclosure::Redacted);
    }
}
