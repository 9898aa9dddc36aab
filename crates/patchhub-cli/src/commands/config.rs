//! `patchhub config`.

use anyhow::{Context, Result};
use patchhub_config::{ResolvedConfig, SYSTEM_CONFIG_PATH, ShowFormat, known_env_vars};

use crate::OutputFormat;
use crate::theme::Theme;

pub(crate) fn show_config(resolved: &ResolvedConfig, format: OutputFormat) -> Result<()> {
    let show = match format {
        OutputFormat::Json => ShowFormat::Json,
        OutputFormat::Pretty => ShowFormat::Toml,
    };
    let rendered = resolved
        .show(show)
        .context("failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn show_paths(resolved: &ResolvedConfig) {
    println!("{}", Theme::header("Configuration files (lowest precedence first)"));
    println!("  {SYSTEM_CONFIG_PATH}");
    println!("  {}", resolved.user_config_path().display());
    println!("\n{}", Theme::header("Data"));
    println!("  Credentials:  {}", resolved.credentials_path().display());
    println!("  Install root: {}", resolved.install_root().display());
    println!("\n{}", Theme::header("Environment fallbacks"));
    for var in known_env_vars() {
        println!("  {var}");
    }
}
