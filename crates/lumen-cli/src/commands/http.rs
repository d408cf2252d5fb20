//! HTTP bridge command.

use anyhow::{Context, Result};
use lumen_core::http::HttpLightClient;

use crate::cli::HttpAction;
use crate::style;

pub async fn cmd_http(url: &str, action: HttpAction, quiet: bool, no_color: bool) -> Result<()> {
    let client = HttpLightClient::new(url).context("Invalid HTTP bridge URL")?;

    let message = match action {
        HttpAction::Color { color } => {
            client
                .set_color(color)
                .await
                .with_context(|| format!("Failed to set colour via {}", client.base_url()))?;
            format!("Colour set to {}", style::format_color_swatch(color, no_color))
        }
        HttpAction::Off => {
            client
                .shutdown()
                .await
                .with_context(|| format!("Failed to turn off via {}", client.base_url()))?;
            "Light turned off".to_string()
        }
    };

    if !quiet {
        println!("{}", style::format_success(&message, no_color));
    }
    Ok(())
}
