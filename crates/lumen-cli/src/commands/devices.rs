//! Commands that inspect and edit the saved bindings without touching the radio.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::cli::OutputFormat;
use crate::format::{
    FormatOptions, format_bindings_csv, format_bindings_json, format_bindings_text,
};
use crate::style;
use crate::util::{find_bound_id, open_bindings, write_output};

pub fn cmd_devices(
    data_dir: &Path,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let bindings = open_bindings(data_dir)?;
    let store = bindings.store();

    let content = match format {
        OutputFormat::Json => format_bindings_json(store, opts)?,
        OutputFormat::Text => format_bindings_text(store, opts),
        OutputFormat::Csv => format_bindings_csv(store, opts),
    };
    write_output(output, &content)
}

pub fn cmd_use(data_dir: &Path, device: &str, quiet: bool, no_color: bool) -> Result<()> {
    let mut bindings = open_bindings(data_dir)?;
    let Some(id) = find_bound_id(bindings.store(), device) else {
        bail!(
            "Device '{}' is not bound.\nRun 'lumen devices' to list bound devices.",
            device
        );
    };

    bindings.set_current(&id)?;
    if !quiet {
        println!(
            "{}",
            style::format_success(&format!("Current device is now {}", id), no_color)
        );
    }
    Ok(())
}

pub fn cmd_remove(data_dir: &Path, device: &str, quiet: bool, no_color: bool) -> Result<()> {
    let mut bindings = open_bindings(data_dir)?;
    let Some(id) = find_bound_id(bindings.store(), device) else {
        bail!("Device '{}' is not bound", device);
    };

    let Some(removed) = bindings.remove_binding(&id)? else {
        bail!("Device '{}' is not bound", device);
    };

    if !quiet {
        println!(
            "{}",
            style::format_success(&format!("Removed {}", removed.label()), no_color)
        );
        let current = bindings.store().current_device_id();
        if current.is_empty() {
            println!("{}", style::format_info("No devices left bound", no_color));
        } else {
            println!(
                "{}",
                style::format_info(&format!("Current device: {}", current), no_color)
            );
        }
    }
    Ok(())
}
