//! PatchHub CLI.
//!
//! Search a publisher organization's patched plugins and themes and install
//! them into the local install root.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use patchhub_config::{Config, ResolvedConfig};
use patchhub_hub::ArtifactKind;

mod commands;
mod context;
mod theme;

use commands::{config, install, search, token};
use context::HubContext;

/// PatchHub - patched plugins and themes from a trusted publisher
#[derive(Parser)]
#[command(name = "patchhub")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Use this directory instead of ~/.patchhub
    #[arg(long, global = true, env = "PATCHHUB_HOME")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human readable
    Pretty,
    /// Machine readable
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the publisher's repositories
    Search {
        /// Search term
        term: String,

        /// Artifact kind
        #[arg(short, long, default_value = "plugin")]
        kind: ArtifactKind,
    },

    /// Download and install an archive
    Install {
        /// Archive URL, as printed by `search`
        url: String,

        /// Artifact identifier; becomes the install folder name
        #[arg(long = "id")]
        identifier: String,

        /// Artifact kind
        #[arg(short, long, default_value = "plugin")]
        kind: ArtifactKind,
    },

    /// Manage the registry access token
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Store a token (read from stdin when omitted)
    Set {
        /// Token value
        value: Option<String>,
    },
    /// Show whether a token is configured
    Status,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved configuration with sources
    Show,
    /// List the files and variables consulted
    Paths,
}

fn load_config(home: Option<&std::path::Path>) -> Result<ResolvedConfig> {
    let resolved = match home {
        Some(h) => Config::load_with_home(h),
        None => Config::load(),
    };
    resolved.context("failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let resolved = load_config(cli.home.as_deref())?;

    let log_config = context::to_log_config(&resolved.config, cli.verbose);
    if let Err(e) = patchhub_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command {
        Commands::Search { term, kind } => {
            let ctx = HubContext::build(&resolved)?;
            search::run_search(&ctx, term, kind, cli.format).await?;
        },
        Commands::Install {
            url,
            identifier,
            kind,
        } => {
            let ctx = HubContext::build(&resolved)?;
            install::run_install(&ctx, url, identifier, kind, cli.format).await?;
        },
        Commands::Token { command } => {
            let ctx = HubContext::build(&resolved)?;
            match command {
                TokenCommands::Set { value } => token::set_token(&ctx, value)?,
                TokenCommands::Status => token::token_status(&ctx, cli.format)?,
            }
        },
        Commands::Config { command } => match command {
            ConfigCommands::Show => config::show_config(&resolved, cli.format)?,
            ConfigCommands::Paths => config::show_paths(&resolved),
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_parses_id_and_kind() {
        let cli = Cli::try_parse_from([
            "patchhub",
            "install",
            "https://github.com/Sudo-WP/widget/archive/refs/heads/main.zip",
            "--id",
            "widget",
            "--kind",
            "theme",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Install {
                identifier, kind, ..
            } => {
                assert_eq!(identifier, "widget");
                assert_eq!(kind, ArtifactKind::Theme);
            },
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn search_defaults_to_plugin() {
        let cli = Cli::try_parse_from(["patchhub", "search", "seo"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(matches!(
            cli.command,
            Commands::Search {
                kind: ArtifactKind::Plugin,
                ..
            }
        ));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["patchhub", "search", "seo", "--kind", "widget"]).is_err());
    }

    #[test]
    fn token_set_value_is_optional() {
        let cli = Cli::try_parse_from(["patchhub", "token", "set"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Token {
                command: TokenCommands::Set { value: None }
            }
        ));
    }
}
