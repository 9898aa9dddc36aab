//! `patchhub search`.

use anyhow::{Context, Result};
use colored::Colorize;
use patchhub_hub::{ArtifactKind, SearchPayload, SearchRequest};

use crate::OutputFormat;
use crate::context::HubContext;
use crate::theme::Theme;

pub(crate) async fn run_search(
    ctx: &HubContext,
    term: String,
    kind: ArtifactKind,
    format: OutputFormat,
) -> Result<()> {
    let response = ctx
        .service
        .search(SearchRequest {
            identity: ctx.identity.clone(),
            term,
            kind,
        })
        .await;
    if !response.success {
        return super::fail(&response, format);
    }
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let payload: SearchPayload =
        serde_json::from_value(response.data).context("unexpected search payload")?;
    if let Some(message) = &payload.message {
        println!("{}", Theme::info(message));
        return Ok(());
    }

    println!("{}", Theme::header(&format!("{} results", payload.kind)));
    for card in &payload.cards {
        println!("{}", Theme::separator());
        println!(
            "{} {}  ★ {}  {}",
            card.identifier.bold(),
            Theme::badge(&card.badge),
            card.stars,
            Theme::dimmed(&format!("updated {}", card.updated)),
        );
        println!("  {}", card.description);
        println!("  {}", Theme::dimmed(&card.page_url));
        println!(
            "  {}",
            Theme::dimmed(&format!(
                "patchhub install {} --id {} --kind {}",
                card.install_url, card.identifier, card.kind
            ))
        );
    }
    Ok(())
}
