//! Setup command: pick a device, assign its two endpoints and save the binding.

use std::path::Path;

use anyhow::{Context, Result, bail};
use lumen_core::{ScanOptions, SetupFlow, identifiers_match};
use lumen_types::{CharacteristicInfo, EndpointRole, PeripheralRecord, ServiceEndpoint};

use crate::format::{FormatOptions, characteristic_label, format_characteristics_text};
use crate::style;
use crate::util::{
    open_bindings, open_transport, scan_devices, select_interactive, show_progress,
};

/// Command-line choices for a setup run; anything left `None` is prompted for.
pub struct SetupArgs {
    pub device: Option<String>,
    pub turn_off: Option<ServiceEndpoint>,
    pub set_color: Option<ServiceEndpoint>,
}

pub async fn cmd_setup(
    data_dir: &Path,
    scan: &ScanOptions,
    args: SetupArgs,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<()> {
    let mut bindings = open_bindings(data_dir)?;
    let transport = open_transport().await?;

    let devices = scan_devices(&transport, scan, quiet).await?;
    if devices.is_empty() {
        bail!("No BLE devices found. Make sure the light is powered and in range.");
    }
    let record = pick_device(devices, args.device.as_deref())?;

    let mut flow = SetupFlow::new(&*transport);
    let spinner = show_progress(quiet).then(|| style::connecting_spinner(record.label()));
    let label = record.label().to_string();
    let result = flow.select_device(record).await;
    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    let report = result.with_context(|| format!("Failed to set up {}", label))?;

    for failure in &report.failures {
        eprintln!(
            "{}",
            style::format_warning(
                &format!(
                    "Could not list service {}: {}",
                    failure.service_id, failure.reason
                ),
                opts.no_color
            )
        );
    }

    let writable: Vec<CharacteristicInfo> =
        flow.writable_characteristics().into_iter().cloned().collect();
    if writable.is_empty() {
        flow.cancel().await;
        bail!("{} exposes no writable characteristics", label);
    }
    if !quiet {
        let refs: Vec<&CharacteristicInfo> = writable.iter().collect();
        eprint!("{}", format_characteristics_text(&refs, opts));
    }

    for (role, given) in [
        (EndpointRole::TurnOff, args.turn_off),
        (EndpointRole::SetColor, args.set_color),
    ] {
        let assigned = match given {
            Some(endpoint) => Ok(endpoint),
            None => pick_endpoint(role, &writable),
        }
        .and_then(|endpoint| flow.assign(role, &endpoint).map_err(anyhow::Error::from));

        if let Err(e) = assigned {
            flow.cancel().await;
            return Err(e.context(format!("Failed to assign the {} characteristic", role)));
        }
    }

    let binding = match flow.commit(&mut bindings).await {
        Ok(binding) => binding,
        Err(e) => {
            flow.cancel().await;
            return Err(anyhow::Error::from(e).context("Failed to save binding"));
        }
    };

    if !quiet {
        println!(
            "{}",
            style::format_success(
                &format!(
                    "Bound {} (off: {}, colour: {})",
                    binding.label(),
                    binding.turn_off_endpoint,
                    binding.set_color_endpoint
                ),
                opts.no_color
            )
        );
        if bindings.store().current_device_id() == binding.device_id {
            println!(
                "{}",
                style::format_info("This is now the current device", opts.no_color)
            );
        }
    }
    Ok(())
}

fn pick_device(devices: Vec<PeripheralRecord>, wanted: Option<&str>) -> Result<PeripheralRecord> {
    if let Some(wanted) = wanted {
        return devices
            .into_iter()
            .find(|d| identifiers_match(&d.id, wanted))
            .with_context(|| format!("Device '{}' was not seen during the scan", wanted));
    }

    let items: Vec<String> = devices
        .iter()
        .map(|d| match &d.name {
            Some(name) => format!("{} ({})", name, d.id),
            None => d.id.clone(),
        })
        .collect();
    let index = select_interactive(
        "Select a device to set up",
        &items,
        "No device given. Use --device <IDENTIFIER> when not running interactively.",
    )?;
    devices
        .into_iter()
        .nth(index)
        .context("Selected device is out of range")
}

fn pick_endpoint(role: EndpointRole, writable: &[CharacteristicInfo]) -> Result<ServiceEndpoint> {
    let items: Vec<String> = writable.iter().map(characteristic_label).collect();
    let flag = match role {
        EndpointRole::TurnOff => "--off",
        EndpointRole::SetColor => "--color",
    };
    let index = select_interactive(
        &format!("Characteristic for {}", role),
        &items,
        &format!(
            "No {} characteristic given. Use {} SERVICE/CHAR when not running interactively.",
            role, flag
        ),
    )?;
    writable
        .get(index)
        .map(CharacteristicInfo::endpoint)
        .context("Selected characteristic is out of range")
}
