//! CLI command implementations.

pub mod check;
pub mod config;
pub mod render;
pub mod serve;

use clap::{Args, Subcommand, ValueEnum};

/// Host adapter a request is run through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Adapter {
    /// Node-style: explicit method check, CDN revalidation caching.
    Node,
    /// Fetch-style: host-side routing, one-hour public caching.
    Fetch,
}

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Fail if the HTML template lacks either placeholder.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Request path, optionally with query string.
    #[arg(default_value = "/")]
    pub path: String,

    /// Host adapter to use.
    #[arg(short, long, value_enum, default_value = "node")]
    pub adapter: Adapter,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Extra request headers as `Name: value`.
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// Print only status and headers.
    #[arg(long)]
    pub no_body: bool,
}

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub addr: String,

    /// Host adapter to use.
    #[arg(short, long, value_enum, default_value = "node")]
    pub adapter: Adapter,

    /// Load the build artifacts before accepting requests.
    #[arg(long)]
    pub eager: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration.
    Show,
    /// Write a starter ssr.toml in the working directory.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

/// Parse a `Name: value` header argument.
pub fn parse_header(raw: &str) -> Option<(String, String)> {
    let (name, value) = raw.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("Accept-Language: en-GB"),
            Some(("Accept-Language".to_string(), "en-GB".to_string()))
        );
        assert_eq!(
            parse_header("X-Empty:"),
            Some(("X-Empty".to_string(), String::new()))
        );
        assert_eq!(parse_header("no-colon"), None);
        assert_eq!(parse_header(": value"), None);
    }
}
