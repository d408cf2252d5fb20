//! Platform-agnostic types for BLE LED device bindings.
//!
//! This crate provides the value types shared by the storage layer
//! (lumen-store) and the transport layer (lumen-core).
//!
//! # Features
//!
//! - Scan records, GATT endpoints and characteristic capability flags
//! - The persisted [`DeviceBinding`] shape
//! - [`Rgb`] colour parsing and command payloads
//! - UUID helpers for short and full GATT identifiers
//!
//! # Example
//!
//! ```
//! use lumen_types::{DeviceBinding, Rgb, ServiceEndpoint};
//!
//! let binding = DeviceBinding::new(
//!     "AA:BB",
//!     Some("Desk lamp".to_string()),
//!     ServiceEndpoint::new("180F", "2A19"),
//!     ServiceEndpoint::new("FFE0", "FFE1"),
//! );
//! assert!(binding.is_complete());
//! assert_eq!(Rgb::parse(&binding.color).unwrap().to_payload(), [0xff, 0x24, 0x42]);
//! ```

pub mod color;
pub mod error;
pub mod types;
pub mod uuid;

pub use color::{DEFAULT_COLOR, OFF_COMMAND, Rgb};
pub use error::{ParseError, ParseResult};
pub use types::{
    CharProperties, CharacteristicInfo, DeviceBinding, EndpointRole, PeripheralRecord,
    ServiceEndpoint, ServiceInfo,
};
