//! CLI module for Switchyard
//!
//! # Commands
//!
//! - `serve` - Start the HTTP server
//! - `policies` - Show the effective rate limit table
//! - `route` - Make an offline routing decision for a prompt
//! - `config` - Configuration utilities (init)
//!
//! # Example
//!
//! ```bash
//! # Start server with default config
//! switchyard serve
//!
//! # Which model would a free user get?
//! switchyard route --tier free "Summarize this article"
//! ```

pub mod config;
pub mod output;
pub mod policies;
pub mod route;
pub mod serve;

pub use config::handle_config_init;
pub use policies::handle_policies;
pub use route::handle_route;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Switchyard - admission control and model routing
#[derive(Parser, Debug)]
#[command(
    name = "switchyard",
    version,
    about = "Rate limiting and model routing in front of paid model calls"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Switchyard server
    Serve(ServeArgs),
    /// Show the effective rate limit policies
    Policies(PoliciesArgs),
    /// Route a prompt without contacting the server
    Route(RouteArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "SWITCHYARD_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "SWITCHYARD_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SWITCHYARD_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Share buckets through Redis at this URL
    #[arg(long, env = "SWITCHYARD_REDIS_URL")]
    pub redis_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct PoliciesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Only show one tier (free, pro, business, enterprise)
    #[arg(short, long)]
    pub tier: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml")]
    pub config: PathBuf,
}

#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Prompt text to route
    pub prompt: String,

    /// Caller tier; unknown values route as free
    #[arg(short, long, default_value = "free")]
    pub tier: String,

    /// Caller id recorded on the decision
    #[arg(long, default_value = "cli")]
    pub caller: String,

    /// Exact token count instead of the word-based estimate
    #[arg(long)]
    pub tokens: Option<u32>,

    /// JSON file with a system metrics snapshot
    #[arg(short, long)]
    pub metrics: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Path to configuration file
    #[arg(short, long, default_value = "switchyard.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "switchyard.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

/// Load the config file when present, defaults otherwise, then env overrides.
pub fn load_config(
    path: &std::path::Path,
) -> Result<crate::config::SwitchyardConfig, Box<dyn std::error::Error>> {
    let config = if path.exists() {
        crate::config::SwitchyardConfig::load(Some(path))?
    } else {
        tracing::debug!("Config file not found, using defaults");
        crate::config::SwitchyardConfig::default()
    };
    Ok(config.with_env_overrides())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["switchyard", "serve"]).unwrap();
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.config, PathBuf::from("switchyard.toml"));
                assert!(args.port.is_none());
            }
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["switchyard", "serve", "-p", "9000"]).unwrap();
        match cli.command {
            Commands::Serve(args) => assert_eq!(args.port, Some(9000)),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_cli_parse_policies_json() {
        let cli = Cli::try_parse_from(["switchyard", "policies", "--json", "-t", "pro"]).unwrap();
        match cli.command {
            Commands::Policies(args) => {
                assert!(args.json);
                assert_eq!(args.tier.as_deref(), Some("pro"));
            }
            _ => panic!("Expected Policies command"),
        }
    }

    #[test]
    fn test_cli_parse_route() {
        let cli =
            Cli::try_parse_from(["switchyard", "route", "--tier", "business", "Hello"]).unwrap();
        match cli.command {
            Commands::Route(args) => {
                assert_eq!(args.prompt, "Hello");
                assert_eq!(args.tier, "business");
                assert_eq!(args.caller, "cli");
            }
            _ => panic!("Expected Route command"),
        }
    }

    #[test]
    fn test_cli_parse_route_requires_prompt() {
        assert!(Cli::try_parse_from(["switchyard", "route"]).is_err());
    }

    #[test]
    fn test_cli_parse_config_init() {
        let cli = Cli::try_parse_from(["switchyard", "config", "init", "-o", "x.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Init(ConfigInitArgs { force: false, .. }))
        ));
    }
}
