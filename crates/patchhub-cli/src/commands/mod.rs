//! Subcommand implementations.

pub(crate) mod config;
pub(crate) mod install;
pub(crate) mod search;
pub(crate) mod token;

use anyhow::{Result, bail};
use patchhub_hub::Response;

use crate::OutputFormat;
use crate::theme::Theme;

/// Print a failed [`Response`] and turn it into an error exit.
pub(crate) fn fail(response: &Response, format: OutputFormat) -> Result<()> {
    let message = response.data["message"]
        .as_str()
        .unwrap_or("request failed")
        .to_owned();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputFormat::Pretty => eprintln!("{}", Theme::error(&message)),
    }
    bail!("{}", response.code().unwrap_or("error"))
}
