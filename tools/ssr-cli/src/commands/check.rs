//! Verify that the build output can be loaded.

use anyhow::{bail, Result};
use serde::Serialize;
use ssr_render::ShellTemplate;

use super::CheckArgs;
use crate::context::Context;
use crate::output::format_bytes;

#[derive(Serialize)]
struct CheckReport {
    ok: bool,
    root: String,
    template: String,
    manifest: String,
    render_entry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest_entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    head_placeholder: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body_placeholder: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let layout = ctx.layout();
    let mut report = CheckReport {
        ok: false,
        root: layout.root.display().to_string(),
        template: layout.template_path().display().to_string(),
        manifest: layout.manifest_path().display().to_string(),
        render_entry: layout.render_entry_path().display().to_string(),
        template_bytes: None,
        manifest_entries: None,
        head_placeholder: None,
        body_placeholder: None,
        error: None,
    };

    ctx.output.header("Checking build output");
    ctx.output.kv("root", &report.root);

    let cache = ctx.asset_cache();
    let spinner = ctx.output.spinner("Loading artifacts...");
    let result = cache.ensure_loaded().await;
    spinner.finish_and_clear();

    let bundle = match result {
        Ok(bundle) => bundle,
        Err(err) => {
            report.error = Some(err.to_string());
            if ctx.output.is_json() {
                ctx.output.json(&report);
            }
            ctx.output.kv("failed artifact", err.artifact());
            bail!("{}", err);
        }
    };

    let shell = ShellTemplate::new(bundle.template_html());
    report.ok = true;
    report.template_bytes = Some(bundle.template_html().len());
    report.manifest_entries = Some(bundle.manifest().len());
    report.head_placeholder = Some(shell.has_head_placeholder());
    report.body_placeholder = Some(shell.has_body_placeholder());

    if ctx.output.is_json() {
        ctx.output.json(&report);
    } else {
        ctx.output.success(&format!(
            "Template: {} ({})",
            report.template,
            format_bytes(bundle.template_html().len() as u64)
        ));
        ctx.output.success(&format!(
            "Manifest: {} ({} modules)",
            report.manifest,
            bundle.manifest().len()
        ));
        ctx.output.success(&format!("Render entry: {}", report.render_entry));
        for module in bundle.manifest().modules() {
            ctx.output.debug(&format!(
                "{} -> {}",
                module,
                bundle.manifest().assets_for(module).join(", ")
            ));
        }
    }

    let mut missing = Vec::new();
    if !shell.has_head_placeholder() {
        missing.push(ssr_core::HEAD_PLACEHOLDER);
    }
    if !shell.has_body_placeholder() {
        missing.push(ssr_core::BODY_PLACEHOLDER);
    }
    if !missing.is_empty() {
        let message = format!("Template is missing {}", missing.join(" and "));
        if args.strict {
            bail!(message);
        }
        ctx.output.warn(&message);
    }

    Ok(())
}
