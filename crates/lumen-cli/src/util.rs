//! Utility functions for CLI operations.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use dialoguer::{Select, theme::ColorfulTheme};

use lumen_core::ble::BleTransport;
use lumen_core::{
    Controller, DeviceDirectory, FailureKind, ScanOptions, identifiers_match, scan_into,
};
use lumen_store::{BindingStore, FileStorage, PersistentBindings};
use lumen_types::{DeviceBinding, PeripheralRecord};

use crate::style;

/// Open the binding store kept in `data_dir`.
pub fn open_bindings(data_dir: &Path) -> Result<PersistentBindings<FileStorage>> {
    PersistentBindings::open(FileStorage::new(data_dir))
        .with_context(|| format!("Failed to open device bindings in {}", data_dir.display()))
}

/// Open the host's Bluetooth adapter.
pub async fn open_transport() -> Result<Arc<BleTransport>> {
    let transport = BleTransport::new()
        .await
        .context("Failed to open Bluetooth adapter")?;
    Ok(Arc::new(transport))
}

/// Key under which `device` is bound, matching identifiers loosely.
pub fn find_bound_id(store: &BindingStore, device: &str) -> Option<String> {
    if store.get_binding(device).is_some() {
        return Some(device.to_string());
    }
    store
        .bindings()
        .keys()
        .find(|id| identifiers_match(id, device))
        .cloned()
}

/// The binding for `device`, or the current one when `device` is `None`.
pub fn resolve_binding(store: &BindingStore, device: Option<&str>) -> Result<DeviceBinding> {
    match device {
        Some(device) => {
            let id = find_bound_id(store, device).ok_or_else(|| {
                anyhow::anyhow!(
                    "Device '{}' is not bound.\nRun 'lumen devices' to list bound devices.",
                    device
                )
            })?;
            store
                .get_binding(&id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Device '{}' is not bound", id))
        }
        None => store.current_binding().cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "No active device.\nRun 'lumen setup' to bind one, or pass --device <ID>."
            )
        }),
    }
}

/// Spinners are drawn only for interactive, non-quiet runs.
pub fn show_progress(quiet: bool) -> bool {
    !quiet && io::stderr().is_terminal()
}

/// Scan with a spinner and return the records found.
pub async fn scan_devices(
    transport: &BleTransport,
    options: &ScanOptions,
    quiet: bool,
) -> Result<Vec<PeripheralRecord>> {
    let spinner =
        show_progress(quiet).then(|| style::scanning_spinner(options.duration.as_secs()));

    let mut directory = DeviceDirectory::new();
    let result = scan_into(transport, &mut directory, options).await;

    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    result.context("Failed to scan for devices")?;
    Ok(directory.values().cloned().collect())
}

/// Connect `controller` to `device_id` with a spinner.
pub async fn activate_with_spinner(
    controller: &Controller<BleTransport>,
    device_id: &str,
    quiet: bool,
) -> Result<()> {
    let spinner = show_progress(quiet).then(|| style::connecting_spinner(device_id));
    let result = controller.activate(device_id).await;
    if let Some(sp) = spinner {
        sp.finish_and_clear();
    }
    result.with_context(|| format!("Failed to connect to {}", device_id))
}

/// Let the user pick one of `items`, or fail when not on a terminal.
pub fn select_interactive(prompt: &str, items: &[String], hint: &str) -> Result<usize> {
    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        bail!("{}", hint);
    }
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .context("Failed to get user selection")
}

/// Failure category of the first core error in `err`'s chain.
pub fn failure_kind(err: &anyhow::Error) -> Option<FailureKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<lumen_core::Error>())
        .map(lumen_core::Error::kind)
}

/// Write output to file or stdout
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}
