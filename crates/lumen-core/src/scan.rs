//! Peripheral scanning.
//!
//! A scan always restarts from an empty [`DeviceDirectory`] and stops the
//! radio scan when it finishes, whether or not it succeeded.

use std::time::Duration;

use tracing::{info, warn};

use lumen_types::PeripheralRecord;

use crate::directory::DeviceDirectory;
use crate::error::{Error, Result};
use crate::transport::GattTransport;

/// Options for scanning.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long to scan for devices.
    pub duration: Duration,
    /// Keep only peripherals whose name or id contains this text
    /// (case-insensitive).
    pub name_filter: Option<String>,
    /// Skip peripherals that advertise no name.
    pub named_only: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(5),
            name_filter: None,
            named_only: false,
        }
    }
}

impl ScanOptions {
    /// Create new scan options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set scan duration in seconds.
    pub fn duration_secs(mut self, secs: u64) -> Self {
        self.duration = Duration::from_secs(secs);
        self
    }

    pub fn name_filter(mut self, filter: impl Into<String>) -> Self {
        self.name_filter = Some(filter.into());
        self
    }

    pub fn named_only(mut self, named_only: bool) -> Self {
        self.named_only = named_only;
        self
    }

    /// Whether `record` passes the filters.
    pub fn matches(&self, record: &PeripheralRecord) -> bool {
        if self.named_only && record.name.is_none() {
            return false;
        }
        match &self.name_filter {
            Some(filter) => {
                let filter = filter.to_lowercase();
                record.id.to_lowercase().contains(&filter)
                    || record
                        .name
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(&filter))
            }
            None => true,
        }
    }
}

/// Scan and collect matching peripherals into `directory`.
///
/// Returns the number of peripherals in the directory afterwards.
///
/// # Errors
///
/// Returns an error if:
/// - The adapter is powered off or missing
/// - The scan could not be started or stopped
pub async fn scan_into<T: GattTransport + ?Sized>(
    transport: &T,
    directory: &mut DeviceDirectory,
    options: &ScanOptions,
) -> Result<usize> {
    let state = transport.adapter_state().await?;
    if !state.is_usable() {
        return Err(Error::TransportOff(state));
    }

    directory.clear();
    info!(
        "Starting BLE scan for {} seconds...",
        options.duration.as_secs()
    );

    let scanned = transport
        .scan(options.duration, &mut |record: PeripheralRecord| {
            if options.matches(&record) {
                directory.add_device(record);
            }
        })
        .await;
    let stopped = transport.stop_scan().await;

    if let Err(e) = &stopped {
        warn!("Failed to stop scan: {}", e);
    }
    scanned?;
    stopped?;

    info!("Scan complete. Found {} device(s)", directory.len());
    Ok(directory.len())
}
