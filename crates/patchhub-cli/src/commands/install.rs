//! `patchhub install`.

use anyhow::Result;
use patchhub_hub::{ArtifactKind, InstallRequest};

use crate::OutputFormat;
use crate::context::HubContext;
use crate::theme::Theme;

pub(crate) async fn run_install(
    ctx: &HubContext,
    url: String,
    identifier: String,
    kind: ArtifactKind,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Pretty {
        println!("{}", Theme::info(&format!("Installing {identifier}...")));
    }
    let response = ctx
        .service
        .install(InstallRequest {
            identity: ctx.identity.clone(),
            url,
            identifier,
            kind,
        })
        .await;
    if !response.success {
        return super::fail(&response, format);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Pretty => {
            let id = response.data["identifier"].as_str().unwrap_or_default();
            let surface = response.data["activation_hint"]
                .as_str()
                .unwrap_or_default();
            println!("{}", Theme::success(&format!("Installed {id}")));
            println!(
                "{}",
                Theme::dimmed(&format!("Activate it from the {surface} screen."))
            );
        },
    }
    Ok(())
}
