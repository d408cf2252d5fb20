//! Core BLE library for Lumen LED controllers.
//!
//! This crate finds BLE light controllers, walks the user through binding
//! a device's characteristics to commands, and writes those commands.
//!
//! # Features
//!
//! - **Scanning**: Collect nearby peripherals into a [`DeviceDirectory`]
//! - **Discovery**: List services and writable characteristics, reporting
//!   services that could not be read
//! - **Setup**: Assign the turn-off and set-colour characteristics and save
//!   the result as a [`DeviceBinding`]
//! - **Control**: Send the off command (`[1]`) or a colour (`[r, g, b]`)
//! - **HTTP bridge** (feature `http-client`): drive a networked controller
//! - **Testing**: An in-memory [`mock::MockTransport`]
//!
//! # Platform Differences
//!
//! - **macOS**: Peripherals are identified by a CoreBluetooth UUID, stable on
//!   one Mac but different across machines.
//! - **Linux/Windows**: Peripherals are identified by their MAC address
//!   (e.g., `AA:BB:CC:DD:EE:FF`).
//!
//! A binding saved on one machine may therefore not match on another.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use lumen_core::ble::BleTransport;
//! use lumen_core::{Controller, DeviceDirectory, Rgb, ScanOptions, scan_into};
//! use lumen_store::{FileStorage, PersistentBindings, default_data_dir};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(BleTransport::new().await?);
//!
//!     let mut directory = DeviceDirectory::new();
//!     let found = scan_into(transport.as_ref(), &mut directory, &ScanOptions::new()).await?;
//!     println!("Found {} devices", found);
//!
//!     let bindings = PersistentBindings::open(FileStorage::new(default_data_dir()))?;
//!     if let Some(binding) = bindings.store().current_binding() {
//!         let controller = Controller::new(transport);
//!         controller.activate(&binding.device_id).await?;
//!         controller.send_color(binding, Rgb::new(255, 0, 0)).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod control;
pub mod directory;
pub mod discovery;
pub mod error;
#[cfg(feature = "http-client")]
pub mod http;
pub mod mock;
pub mod scan;
pub mod setup;
pub mod transport;
pub mod util;

pub use control::Controller;
pub use directory::DeviceDirectory;
pub use discovery::{DiscoveredService, DiscoveryFailure, DiscoveryReport, discover};
pub use error::{Error, FailureKind, Result};
pub use scan::{ScanOptions, scan_into};
pub use setup::{SetupDraft, SetupFlow, SetupState};
pub use transport::{AdapterState, GattSession, GattTransport};
pub use util::{create_identifier, format_peripheral_id, identifiers_match};

// Re-export from lumen-types
pub use lumen_types::{
    CharProperties, CharacteristicInfo, DeviceBinding, EndpointRole, PeripheralRecord, Rgb,
    ServiceEndpoint, ServiceInfo,
};
