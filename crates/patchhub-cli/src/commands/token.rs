//! `patchhub token` - manage the registry access token.

use std::io::BufRead;

use anyhow::{Context, Result};
use patchhub_hub::{CredentialStore, mask_token};
use serde_json::json;

use crate::OutputFormat;
use crate::context::HubContext;
use crate::theme::Theme;

/// Store a token. Reads one line from stdin when `value` is absent.
/// Blank input keeps the existing token.
pub(crate) fn set_token(ctx: &HubContext, value: Option<String>) -> Result<()> {
    let value = match value {
        Some(v) => v,
        None => {
            eprintln!("{}", Theme::info("Paste token and press Enter:"));
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read token from stdin")?;
            line
        },
    };

    if ctx.credentials.set_token(&value)? {
        println!(
            "{}",
            Theme::success(&format!(
                "Token saved to {}",
                ctx.credentials.path().display()
            ))
        );
    } else {
        println!(
            "{}",
            Theme::warning("Empty token ignored; existing token kept.")
        );
    }
    Ok(())
}

/// Show whether a token is configured, masked.
pub(crate) fn token_status(ctx: &HubContext, format: OutputFormat) -> Result<()> {
    let token = ctx.credentials.get_token();
    let masked = mask_token(token.as_deref());
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "configured": token.is_some(),
                "token": masked,
                "path": ctx.credentials.path().display().to_string(),
            }))?
        ),
        OutputFormat::Pretty => {
            println!("{}", Theme::header("Registry token"));
            println!("  Token: {masked}");
            println!(
                "  File:  {}",
                Theme::dimmed(&ctx.credentials.path().display().to_string())
            );
            if token.is_none() {
                println!(
                    "{}",
                    Theme::info("Without a token, searches share a low anonymous rate limit.")
                );
            }
        },
    }
    Ok(())
}
