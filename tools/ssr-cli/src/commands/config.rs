//! Configuration management commands.

use anyhow::{bail, Context as _, Result};
use ssr_host::{generate_default_config, SsrConfig, CONFIG_FILE_NAMES};

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Init { force } => init(ctx, force),
        ConfigCommand::Validate => validate(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    match &ctx.config_path {
        Some(path) => ctx.output.info(&format!("Config file: {}", path.display())),
        None => ctx.output.info("No config file found, using defaults"),
    }

    let layout = ctx.layout();
    ctx.output.header("Artifacts");
    ctx.output.kv("template", &layout.template_path().display().to_string());
    ctx.output.kv("manifest", &layout.manifest_path().display().to_string());
    ctx.output
        .kv("render entry", &layout.render_entry_path().display().to_string());

    let rendered = toml::to_string_pretty(&ctx.config).context("Failed to serialize config")?;
    ctx.output.header("Effective configuration");
    println!("{}", rendered);
    Ok(())
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);
    if path.exists() && !force {
        bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    std::fs::write(&path, generate_default_config())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    ctx.output.success(&format!("Created {}", path.display()));
    Ok(())
}

fn validate(ctx: &Context) -> Result<()> {
    let Some(path) = &ctx.config_path else {
        bail!(
            "No config file found (looked for {})",
            CONFIG_FILE_NAMES.join(", ")
        );
    };

    // Reload so the report reflects the file as it is now.
    SsrConfig::load(path).with_context(|| format!("Invalid config: {}", path.display()))?;

    let layout = ctx.layout();
    if !layout.root.is_dir() {
        ctx.output.warn(&format!(
            "Artifact root does not exist yet: {}",
            layout.root.display()
        ));
    }

    ctx.output.success(&format!("{} is valid", path.display()));
    Ok(())
}
