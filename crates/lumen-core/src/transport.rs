//! Transport abstractions for GATT access.
//!
//! [`GattTransport`] is the central role (adapter) and [`GattSession`] a
//! connection to one peripheral. The btleplug implementation lives in
//! [`crate::ble`]; [`crate::mock`] provides an in-memory one for tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use lumen_types::{CharacteristicInfo, PeripheralRecord, ServiceEndpoint, ServiceInfo};

use crate::error::Result;

/// Power state of the local Bluetooth adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterState {
    PoweredOn,
    PoweredOff,
    /// No adapter present.
    Unavailable,
    Unknown,
}

impl AdapterState {
    /// Whether scanning and connecting can be attempted.
    pub fn is_usable(&self) -> bool {
        matches!(self, AdapterState::PoweredOn | AdapterState::Unknown)
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterState::PoweredOn => write!(f, "powered on"),
            AdapterState::PoweredOff => write!(f, "powered off"),
            AdapterState::Unavailable => write!(f, "unavailable"),
            AdapterState::Unknown => write!(f, "in an unknown state"),
        }
    }
}

/// The local central: scanning and opening connections.
///
/// # Example
///
/// ```ignore
/// use lumen_core::{GattTransport, Result};
///
/// async fn list<T: GattTransport>(transport: &T) -> Result<()> {
///     transport
///         .scan(std::time::Duration::from_secs(5), &mut |record: lumen_types::PeripheralRecord| {
///             println!("{} {:?}", record.id, record.name);
///         })
///         .await?;
///     transport.stop_scan().await
/// }
/// ```
#[async_trait]
pub trait GattTransport: Send + Sync {
    type Session: GattSession;

    /// Current adapter power state.
    async fn adapter_state(&self) -> Result<AdapterState>;

    /// Scan for `duration`, reporting each advertisement to `on_found`.
    ///
    /// The same peripheral may be reported more than once.
    async fn scan(
        &self,
        duration: Duration,
        on_found: &mut (dyn FnMut(PeripheralRecord) + Send),
    ) -> Result<()>;

    /// Stop an ongoing scan. Stopping when idle is not an error.
    async fn stop_scan(&self) -> Result<()>;

    /// Open a connection to `device_id`.
    ///
    /// A peripheral the adapter has not seen yet is scanned for first.
    async fn connect(&self, device_id: &str) -> Result<Self::Session>;

    /// Drop any link to `device_id` held outside a session, such as one left
    /// behind by an abandoned [`connect`](Self::connect). No link is not an
    /// error.
    async fn disconnect(&self, device_id: &str) -> Result<()>;
}

/// A live connection to one peripheral.
#[async_trait]
pub trait GattSession: Send + Sync {
    /// Identifier of the connected peripheral.
    fn device_id(&self) -> &str;

    async fn is_connected(&self) -> bool;

    /// List the peripheral's services.
    async fn discover_services(&self) -> Result<Vec<ServiceInfo>>;

    /// List the characteristics of one service.
    async fn discover_characteristics(&self, service_id: &str) -> Result<Vec<CharacteristicInfo>>;

    /// Write `payload` to a characteristic.
    async fn write(&self, endpoint: &ServiceEndpoint, payload: &[u8]) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;
}
