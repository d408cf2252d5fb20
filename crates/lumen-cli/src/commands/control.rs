//! Colour and off commands for bound devices.

use std::path::Path;

use anyhow::{Context, Result};
use lumen_core::Controller;
use lumen_core::ble::BleTransport;
use lumen_types::{DeviceBinding, Rgb};
use tracing::warn;

use crate::style;
use crate::util::{activate_with_spinner, open_bindings, open_transport, resolve_binding};

pub async fn cmd_color(
    data_dir: &Path,
    color: Rgb,
    device: Option<&str>,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    let mut bindings = open_bindings(data_dir)?;
    let binding = resolve_binding(bindings.store(), device)?;

    let controller = Controller::new(open_transport().await?);
    let sent = send(&controller, &binding, Command::Color(color), quiet).await;
    sent.with_context(|| format!("Failed to set colour of {}", binding.label()))?;

    if bindings.store().current_device_id() == binding.device_id {
        bindings.set_color(color)?;
    } else {
        let updated = binding.clone().with_color(color.to_hex());
        bindings.set_binding(updated.device_id.clone(), updated)?;
    }

    if !quiet {
        println!(
            "{}",
            style::format_success(
                &format!(
                    "{} set to {}",
                    binding.label(),
                    style::format_color_swatch(color, no_color)
                ),
                no_color
            )
        );
    }
    Ok(())
}

pub async fn cmd_off(
    data_dir: &Path,
    device: Option<&str>,
    quiet: bool,
    no_color: bool,
) -> Result<()> {
    let bindings = open_bindings(data_dir)?;
    let binding = resolve_binding(bindings.store(), device)?;

    let controller = Controller::new(open_transport().await?);
    let sent = send(&controller, &binding, Command::Off, quiet).await;
    sent.with_context(|| format!("Failed to turn off {}", binding.label()))?;

    if !quiet {
        println!(
            "{}",
            style::format_success(&format!("{} turned off", binding.label()), no_color)
        );
    }
    Ok(())
}

enum Command {
    Off,
    Color(Rgb),
}

/// Connect, write one command and always disconnect afterwards.
async fn send(
    controller: &Controller<BleTransport>,
    binding: &DeviceBinding,
    command: Command,
    quiet: bool,
) -> Result<()> {
    activate_with_spinner(controller, &binding.device_id, quiet).await?;
    let result = match command {
        Command::Off => controller.send_off(binding).await,
        Command::Color(color) => controller.send_color(binding, color).await,
    };
    if let Err(e) = controller.deactivate().await {
        warn!("Failed to disconnect from {}: {}", binding.device_id, e);
    }
    Ok(result?)
}
