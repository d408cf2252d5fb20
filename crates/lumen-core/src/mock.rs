//! Mock transport for testing.
//!
//! [`MockTransport`] implements [`GattTransport`] over an in-memory list of
//! peripherals, so scanning, setup and control can be exercised without
//! Bluetooth hardware.
//!
//! # Features
//!
//! - **Write recording**: every successful write is kept for inspection
//! - **Failure injection**: fail connects, writes, or one service's discovery
//! - **Latency simulation**: delay connects to exercise cancellation
//! - **Adapter cache**: only scanned peripherals are known; connecting to an
//!   unknown one runs a lookup scan first, like the btleplug transport

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lumen_types::uuid::same_id;
use lumen_types::{
    CharProperties, CharacteristicInfo, PeripheralRecord, ServiceEndpoint, ServiceInfo,
};

use crate::error::{Error, Result};
use crate::transport::{AdapterState, GattSession, GattTransport};
use crate::util::identifiers_match;

/// A write captured by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub device_id: String,
    pub endpoint: ServiceEndpoint,
    pub payload: Vec<u8>,
}

/// A service offered by a [`MockPeripheral`].
#[derive(Debug, Clone)]
pub struct MockService {
    pub service_id: String,
    pub characteristics: Vec<CharacteristicInfo>,
    /// Make characteristic discovery of this service fail.
    pub fail_discovery: bool,
}

impl MockService {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            characteristics: Vec::new(),
            fail_discovery: false,
        }
    }

    /// Add a characteristic with the given flags.
    #[must_use]
    pub fn characteristic(
        mut self,
        characteristic_id: impl Into<String>,
        properties: CharProperties,
    ) -> Self {
        self.characteristics.push(CharacteristicInfo {
            service_id: self.service_id.clone(),
            characteristic_id: characteristic_id.into(),
            properties,
        });
        self
    }

    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail_discovery = true;
        self
    }
}

/// Characteristic flags accepting writes without response.
pub fn write_without_response() -> CharProperties {
    CharProperties {
        writable_without_response: true,
        ..Default::default()
    }
}

/// Characteristic flags accepting writes with response.
pub fn write_with_response() -> CharProperties {
    CharProperties {
        writable_with_response: true,
        ..Default::default()
    }
}

/// Read-only characteristic flags.
pub fn read_only() -> CharProperties {
    CharProperties {
        readable: true,
        ..Default::default()
    }
}

/// A peripheral the mock can report and connect to.
#[derive(Debug, Clone)]
pub struct MockPeripheral {
    pub record: PeripheralRecord,
    pub services: Vec<MockService>,
    /// Whether scans can see this peripheral.
    pub advertising: bool,
}

impl MockPeripheral {
    pub fn new(id: &str, name: Option<&str>) -> Self {
        Self {
            record: PeripheralRecord::new(id, name.map(str::to_string)),
            services: Vec::new(),
            advertising: true,
        }
    }

    /// A typical LED controller: battery `180F/2A19` and `FFE0/FFE1` are
    /// writable, device information `180A/2A29` is read-only.
    pub fn led_controller(id: &str, name: &str) -> Self {
        Self::new(id, Some(name))
            .service(MockService::new("180A").characteristic("2A29", read_only()))
            .service(MockService::new("180F").characteristic("2A19", write_with_response()))
            .service(
                MockService::new("FFE0")
                    .characteristic("FFE1", write_without_response())
                    .characteristic("FFE2", read_only()),
            )
    }

    #[must_use]
    pub fn service(mut self, service: MockService) -> Self {
        self.services.push(service);
        self
    }

    #[must_use]
    pub fn rssi(mut self, rssi: i16) -> Self {
        self.record.rssi = Some(rssi);
        self
    }

    /// Stop advertising, as if powered off or out of range.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.advertising = false;
        self
    }
}

#[derive(Debug, Default)]
struct Shared {
    connected: RwLock<HashSet<String>>,
    /// Peripherals the adapter has seen advertising.
    known: RwLock<HashSet<String>>,
    writes: RwLock<Vec<RecordedWrite>>,
    fail_writes: AtomicBool,
    scanning: AtomicBool,
    connect_count: AtomicU32,
    disconnect_count: AtomicU32,
    lookup_scans: AtomicU32,
}

/// A mock transport for testing.
///
/// # Example
///
/// ```
/// use lumen_core::mock::{MockPeripheral, MockTransport};
/// use lumen_core::{GattSession, GattTransport};
/// use lumen_types::ServiceEndpoint;
///
/// #[tokio::main]
/// async fn main() {
///     let transport = MockTransport::new()
///         .with_peripheral(MockPeripheral::led_controller("AA:BB", "Lamp"));
///     let session = transport.connect("AA:BB").await.unwrap();
///     session
///         .write(&ServiceEndpoint::new("FFE0", "FFE1"), &[255, 0, 0])
///         .await
///         .unwrap();
///     assert_eq!(transport.writes().await.len(), 1);
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    peripherals: Vec<MockPeripheral>,
    adapter_state: RwLock<AdapterState>,
    fail_connect: AtomicBool,
    connect_latency_ms: AtomicU64,
    shared: Arc<Shared>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a powered-on transport with no peripherals.
    pub fn new() -> Self {
        Self {
            peripherals: Vec::new(),
            adapter_state: RwLock::new(AdapterState::PoweredOn),
            fail_connect: AtomicBool::new(false),
            connect_latency_ms: AtomicU64::new(0),
            shared: Arc::new(Shared::default()),
        }
    }

    #[must_use]
    pub fn with_peripheral(mut self, peripheral: MockPeripheral) -> Self {
        self.peripherals.push(peripheral);
        self
    }

    // --- Test control methods ---

    pub async fn set_adapter_state(&self, state: AdapterState) {
        *self.adapter_state.write().await = state;
    }

    /// Make every following connect attempt fail.
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::Relaxed);
    }

    /// Make every following write fail with a transport fault.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Relaxed);
    }

    pub fn set_connect_latency(&self, latency: Duration) {
        self.connect_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Drop the link to `device_id` as if the peripheral went out of range.
    pub async fn drop_link(&self, device_id: &str) {
        self.shared.connected.write().await.remove(device_id);
    }

    /// Writes recorded so far, oldest first.
    pub async fn writes(&self) -> Vec<RecordedWrite> {
        self.shared.writes.read().await.clone()
    }

    pub async fn is_connected(&self, device_id: &str) -> bool {
        self.shared.connected.read().await.contains(device_id)
    }

    pub fn is_scanning(&self) -> bool {
        self.shared.scanning.load(Ordering::Relaxed)
    }

    pub fn connect_count(&self) -> u32 {
        self.shared.connect_count.load(Ordering::Relaxed)
    }

    pub fn disconnect_count(&self) -> u32 {
        self.shared.disconnect_count.load(Ordering::Relaxed)
    }

    /// Scans `connect` had to run for peripherals missing from the cache.
    pub fn lookup_scans(&self) -> u32 {
        self.shared.lookup_scans.load(Ordering::Relaxed)
    }

    /// Record every advertising peripheral in the adapter cache.
    async fn remember_advertising(&self) {
        let mut known = self.shared.known.write().await;
        for peripheral in self.peripherals.iter().filter(|p| p.advertising) {
            known.insert(peripheral.record.id.clone());
        }
    }

    async fn locate(&self, device_id: &str) -> Result<&MockPeripheral> {
        let found = self
            .peripherals
            .iter()
            .find(|p| identifiers_match(&p.record.id, device_id));
        if let Some(peripheral) = found
            && self.shared.known.read().await.contains(&peripheral.record.id)
        {
            return Ok(peripheral);
        }

        self.shared.lookup_scans.fetch_add(1, Ordering::Relaxed);
        self.remember_advertising().await;
        found
            .filter(|p| p.advertising)
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))
    }

    async fn check_adapter(&self) -> Result<()> {
        let state = *self.adapter_state.read().await;
        if state.is_usable() {
            Ok(())
        } else {
            Err(Error::TransportOff(state))
        }
    }
}

#[async_trait]
impl GattTransport for MockTransport {
    type Session = MockSession;

    async fn adapter_state(&self) -> Result<AdapterState> {
        Ok(*self.adapter_state.read().await)
    }

    async fn scan(
        &self,
        _duration: Duration,
        on_found: &mut (dyn FnMut(PeripheralRecord) + Send),
    ) -> Result<()> {
        self.check_adapter().await?;
        self.shared.scanning.store(true, Ordering::Relaxed);
        self.remember_advertising().await;
        for peripheral in self.peripherals.iter().filter(|p| p.advertising) {
            on_found(peripheral.record.clone());
        }
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.shared.scanning.store(false, Ordering::Relaxed);
        Ok(())
    }

    async fn connect(&self, device_id: &str) -> Result<MockSession> {
        self.check_adapter().await?;
        let peripheral = self.locate(device_id).await?;

        if self.fail_connect.load(Ordering::Relaxed) {
            return Err(Error::connection_failed(device_id, "mock connect failure"));
        }

        // The link comes up before the connect call returns, so a caller
        // that abandons a slow connect leaves the link behind.
        let id = peripheral.record.id.clone();
        self.shared.connected.write().await.insert(id.clone());
        self.shared.connect_count.fetch_add(1, Ordering::Relaxed);

        let latency = self.connect_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        Ok(MockSession {
            device_id: id,
            services: peripheral.services.clone(),
            shared: Arc::clone(&self.shared),
        })
    }

    async fn disconnect(&self, device_id: &str) -> Result<()> {
        let mut connected = self.shared.connected.write().await;
        let before = connected.len();
        connected.retain(|id| !identifiers_match(id, device_id));
        if connected.len() < before {
            self.shared.disconnect_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// Session returned by [`MockTransport::connect`].
#[derive(Debug)]
pub struct MockSession {
    device_id: String,
    services: Vec<MockService>,
    shared: Arc<Shared>,
}

impl MockSession {
    async fn ensure_connected(&self) -> Result<()> {
        if self.is_connected().await {
            Ok(())
        } else {
            Err(Error::NotConnected(self.device_id.clone()))
        }
    }

    fn find(&self, endpoint: &ServiceEndpoint) -> Option<&CharacteristicInfo> {
        self.services
            .iter()
            .filter(|s| same_id(&s.service_id, &endpoint.service_id))
            .flat_map(|s| s.characteristics.iter())
            .find(|c| same_id(&c.characteristic_id, &endpoint.characteristic_id))
    }
}

#[async_trait]
impl GattSession for MockSession {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn is_connected(&self) -> bool {
        self.shared.connected.read().await.contains(&self.device_id)
    }

    async fn discover_services(&self) -> Result<Vec<ServiceInfo>> {
        self.ensure_connected().await?;
        Ok(self
            .services
            .iter()
            .map(|s| ServiceInfo {
                service_id: s.service_id.clone(),
                primary: true,
            })
            .collect())
    }

    async fn discover_characteristics(&self, service_id: &str) -> Result<Vec<CharacteristicInfo>> {
        self.ensure_connected().await?;
        let service = self
            .services
            .iter()
            .find(|s| same_id(&s.service_id, service_id))
            .ok_or_else(|| Error::DiscoveryFailed {
                service_id: service_id.to_string(),
                reason: "service not present".to_string(),
            })?;
        if service.fail_discovery {
            return Err(Error::DiscoveryFailed {
                service_id: service_id.to_string(),
                reason: "mock discovery failure".to_string(),
            });
        }
        Ok(service.characteristics.clone())
    }

    async fn write(&self, endpoint: &ServiceEndpoint, payload: &[u8]) -> Result<()> {
        self.ensure_connected().await?;
        let characteristic = self
            .find(endpoint)
            .ok_or_else(|| Error::CharacteristicNotFound(endpoint.to_string()))?;
        if !characteristic.properties.is_writable() {
            return Err(Error::NotWritable(endpoint.to_string()));
        }
        if self.shared.fail_writes.load(Ordering::Relaxed) {
            return Err(Error::write_failed(endpoint, "mock write failure"));
        }

        self.shared.writes.write().await.push(RecordedWrite {
            device_id: self.device_id.clone(),
            endpoint: endpoint.clone(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.shared.connected.write().await.remove(&self.device_id) {
            self.shared.disconnect_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> MockTransport {
        MockTransport::new().with_peripheral(MockPeripheral::led_controller("AA:BB", "Lamp"))
    }

    #[tokio::test]
    async fn test_scan_reports_peripherals() {
        let transport = transport().with_peripheral(MockPeripheral::new("CC:DD", None));
        let mut seen = Vec::new();
        transport
            .scan(Duration::from_secs(1), &mut |r: PeripheralRecord| seen.push(r.id))
            .await
            .unwrap();
        assert_eq!(seen, vec!["AA:BB", "CC:DD"]);
        assert!(transport.is_scanning());
        transport.stop_scan().await.unwrap();
        assert!(!transport.is_scanning());
    }

    #[tokio::test]
    async fn test_connect_unknown_device() {
        let result = transport().connect("nope").await;
        assert!(matches!(result, Err(Error::DeviceNotFound(_))));
    }

    #[tokio::test]
    async fn test_connect_uncached_device_scans_first() {
        let transport = transport();
        let session = transport.connect("AA:BB").await.unwrap();
        assert_eq!(transport.lookup_scans(), 1);
        session.disconnect().await.unwrap();

        transport.connect("AA:BB").await.unwrap();
        assert_eq!(transport.lookup_scans(), 1);
    }

    #[tokio::test]
    async fn test_connect_after_scan_uses_cache() {
        let transport = transport();
        transport
            .scan(Duration::from_secs(1), &mut |_: PeripheralRecord| {})
            .await
            .unwrap();
        transport.connect("AA:BB").await.unwrap();
        assert_eq!(transport.lookup_scans(), 0);
    }

    #[tokio::test]
    async fn test_silent_device_is_not_found() {
        let transport =
            transport().with_peripheral(MockPeripheral::led_controller("CC:DD", "Shelf").silent());
        let mut seen = Vec::new();
        transport
            .scan(Duration::from_secs(1), &mut |r: PeripheralRecord| seen.push(r.id))
            .await
            .unwrap();
        assert_eq!(seen, vec!["AA:BB"]);

        let result = transport.connect("CC:DD").await;
        assert!(matches!(result, Err(Error::DeviceNotFound(_))));
        assert_eq!(transport.lookup_scans(), 1);
    }

    #[tokio::test]
    async fn test_connect_matches_identifier_loosely() {
        let transport = transport();
        let session = transport.connect("aabb").await.unwrap();
        assert_eq!(session.device_id(), "AA:BB");
        assert!(transport.is_connected("AA:BB").await);
    }

    #[tokio::test]
    async fn test_transport_disconnect_drops_link() {
        let transport = transport();
        let session = transport.connect("AA:BB").await.unwrap();
        transport.disconnect("aa:bb").await.unwrap();
        assert!(!session.is_connected().await);
        assert_eq!(transport.disconnect_count(), 1);

        transport.disconnect("AA:BB").await.unwrap();
        assert_eq!(transport.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_with_adapter_off() {
        let transport = transport();
        transport.set_adapter_state(AdapterState::PoweredOff).await;
        assert!(matches!(
            transport.connect("AA:BB").await,
            Err(Error::TransportOff(AdapterState::PoweredOff))
        ));
    }

    #[tokio::test]
    async fn test_write_records_payload() {
        let transport = transport();
        let session = transport.connect("AA:BB").await.unwrap();
        let endpoint = ServiceEndpoint::new("ffe0", "ffe1");
        session.write(&endpoint, &[1, 2, 3]).await.unwrap();

        let writes = transport.writes().await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].payload, vec![1, 2, 3]);
        assert_eq!(writes[0].device_id, "AA:BB");
    }

    #[tokio::test]
    async fn test_write_rejections() {
        let transport = transport();
        let session = transport.connect("AA:BB").await.unwrap();

        let read_only = ServiceEndpoint::new("FFE0", "FFE2");
        assert!(matches!(
            session.write(&read_only, &[1]).await,
            Err(Error::NotWritable(_))
        ));

        let missing = ServiceEndpoint::new("FFE0", "FFE9");
        assert!(matches!(
            session.write(&missing, &[1]).await,
            Err(Error::CharacteristicNotFound(_))
        ));

        transport.set_fail_writes(true);
        let writable = ServiceEndpoint::new("FFE0", "FFE1");
        assert!(matches!(
            session.write(&writable, &[1]).await,
            Err(Error::WriteFailed { .. })
        ));

        transport.drop_link("AA:BB").await;
        assert!(matches!(
            session.write(&writable, &[1]).await,
            Err(Error::NotConnected(_))
        ));
        assert!(transport.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_counts_once() {
        let transport = transport();
        let session = transport.connect("AA:BB").await.unwrap();
        session.disconnect().await.unwrap();
        session.disconnect().await.unwrap();
        assert_eq!(transport.disconnect_count(), 1);
        assert!(!session.is_connected().await);
    }
}
