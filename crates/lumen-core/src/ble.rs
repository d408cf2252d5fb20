//! btleplug-backed transport.
//!
//! Every suspension point (connect, service discovery, write) is bounded by
//! a timeout from [`ConnectionConfig`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, CharPropFlags, Characteristic, Manager as _,
    Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use lumen_types::uuid::{display_uuid, parse_uuid};
use lumen_types::{
    CharProperties, CharacteristicInfo, PeripheralRecord, ServiceEndpoint, ServiceInfo,
};

use crate::error::{Error, Result};
use crate::transport::{AdapterState, GattSession, GattTransport};
use crate::util::{create_identifier, identifiers_match};

/// Default timeout for BLE connection operations.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default timeout for service discovery.
const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for BLE characteristic write operations.
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time spent scanning for a device the adapter has not seen yet.
const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How often the adapter's peripheral list is checked during a lookup scan.
const LOOKUP_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeouts applied to BLE operations.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use lumen_core::ble::ConnectionConfig;
///
/// let config = ConnectionConfig::default()
///     .connection_timeout(Duration::from_secs(20))
///     .write_timeout(Duration::from_secs(5))
///     .lookup_timeout(Duration::from_secs(4));
/// assert_eq!(config.write_timeout, Duration::from_secs(5));
/// assert_eq!(config.lookup_timeout, Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Timeout for establishing a BLE connection.
    pub connection_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Timeout for BLE write operations.
    pub write_timeout: Duration,
    /// How long `connect` scans for a device missing from the adapter's cache.
    pub lookup_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the write timeout.
    #[must_use]
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set how long to scan for a device that is not cached yet.
    #[must_use]
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters
        .into_iter()
        .next()
        .ok_or(Error::TransportOff(AdapterState::Unavailable))
}

/// Transport over the host's first Bluetooth adapter.
pub struct BleTransport {
    adapter: Adapter,
    config: ConnectionConfig,
}

impl std::fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BleTransport {
    /// Open the first adapter with default timeouts.
    pub async fn new() -> Result<Self> {
        Self::with_config(ConnectionConfig::default()).await
    }

    pub async fn with_config(config: ConnectionConfig) -> Result<Self> {
        let adapter = get_adapter().await?;
        Ok(Self { adapter, config })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn describe(&self, id: &PeripheralId) -> Option<PeripheralRecord> {
        let peripheral = self.adapter.peripheral(id).await.ok()?;
        let properties = peripheral.properties().await.ok()??;
        let identifier = create_identifier(&properties.address.to_string(), id);
        let mut record = PeripheralRecord::new(identifier, properties.local_name);
        // btleplug does not surface the advertised connectable flag.
        record.is_connectable = true;
        record.rssi = properties.rssi;
        Some(record)
    }

    async fn find_peripheral(&self, device_id: &str) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await? {
            let Ok(Some(properties)) = peripheral.properties().await else {
                continue;
            };
            let identifier = create_identifier(&properties.address.to_string(), &peripheral.id());
            if identifiers_match(&identifier, device_id) {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }

    /// Find `device_id`, scanning for it when the adapter has not seen it.
    ///
    /// A fresh process starts with an empty peripheral cache on most
    /// platforms, so a saved binding needs a scan before it can connect.
    async fn locate(&self, device_id: &str) -> Result<Peripheral> {
        if let Some(peripheral) = self.find_peripheral(device_id).await? {
            debug!("Found {} in adapter cache", device_id);
            return Ok(peripheral);
        }

        info!(
            "Scanning up to {}s for {}...",
            self.config.lookup_timeout.as_secs(),
            device_id
        );
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(scan_error)?;

        let deadline = Instant::now() + self.config.lookup_timeout;
        let found = loop {
            match self.find_peripheral(device_id).await {
                Ok(Some(peripheral)) => break Ok(Some(peripheral)),
                Ok(None) if Instant::now() < deadline => sleep(LOOKUP_POLL_INTERVAL).await,
                other => break other,
            }
        };

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop lookup scan: {}", e);
        }

        match found? {
            Some(peripheral) => {
                info!("Found {} after scanning", device_id);
                Ok(peripheral)
            }
            None => {
                warn!("{} did not advertise within {:?}", device_id, self.config.lookup_timeout);
                Err(Error::DeviceNotFound(device_id.to_string()))
            }
        }
    }
}

fn scan_error(e: btleplug::Error) -> Error {
    match e {
        btleplug::Error::PermissionDenied => Error::PermissionDenied,
        other => Error::Bluetooth(other),
    }
}

#[async_trait]
impl GattTransport for BleTransport {
    type Session = BleSession;

    async fn adapter_state(&self) -> Result<AdapterState> {
        let state = match self.adapter.adapter_state().await {
            Ok(CentralState::PoweredOn) => AdapterState::PoweredOn,
            Ok(CentralState::PoweredOff) => AdapterState::PoweredOff,
            Ok(_) => AdapterState::Unknown,
            Err(btleplug::Error::PermissionDenied) => return Err(Error::PermissionDenied),
            Err(e) => {
                debug!("Adapter state unavailable: {}", e);
                AdapterState::Unknown
            }
        };
        Ok(state)
    }

    async fn scan(
        &self,
        duration: Duration,
        on_found: &mut (dyn FnMut(PeripheralRecord) + Send),
    ) -> Result<()> {
        let mut events = self.adapter.events().await?;
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(scan_error)?;
        info!("Scanning for {} seconds...", duration.as_secs());

        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            let remaining = deadline - Instant::now();
            match timeout(remaining, events.next()).await {
                Ok(Some(CentralEvent::DeviceDiscovered(id)))
                | Ok(Some(CentralEvent::DeviceUpdated(id))) => {
                    if let Some(record) = self.describe(&id).await {
                        debug!("Advertisement from {} ({:?})", record.id, record.name);
                        on_found(record);
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    #[tracing::instrument(
        level = "info",
        skip(self),
        fields(timeout = ?self.config.connection_timeout)
    )]
    async fn connect(&self, device_id: &str) -> Result<BleSession> {
        let peripheral = self.locate(device_id).await?;

        info!("Connecting...");
        timeout(self.config.connection_timeout, peripheral.connect())
            .await
            .map_err(|_| {
                Error::timeout(format!("connect to {device_id}"), self.config.connection_timeout)
            })?
            .map_err(|e| match e {
                btleplug::Error::PermissionDenied => Error::PermissionDenied,
                other => Error::connection_failed(device_id, other),
            })?;
        info!("Connected");

        Ok(BleSession {
            peripheral,
            device_id: device_id.to_string(),
            config: self.config.clone(),
            discovered: AtomicBool::new(false),
        })
    }

    async fn disconnect(&self, device_id: &str) -> Result<()> {
        let Some(peripheral) = self.find_peripheral(device_id).await? else {
            return Ok(());
        };
        if peripheral.is_connected().await.unwrap_or(false) {
            info!("Releasing link to {}", device_id);
            peripheral.disconnect().await?;
        }
        Ok(())
    }
}

/// A btleplug connection to one peripheral.
pub struct BleSession {
    peripheral: Peripheral,
    device_id: String,
    config: ConnectionConfig,
    discovered: AtomicBool,
}

impl std::fmt::Debug for BleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleSession")
            .field("device_id", &self.device_id)
            .field("discovered", &self.discovered.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl BleSession {
    /// Run GATT discovery once per connection.
    async fn ensure_discovered(&self) -> Result<()> {
        if self.discovered.load(Ordering::Acquire) {
            return Ok(());
        }
        timeout(self.config.discovery_timeout, self.peripheral.discover_services())
            .await
            .map_err(|_| Error::timeout("discover services", self.config.discovery_timeout))??;
        self.discovered.store(true, Ordering::Release);
        Ok(())
    }

    fn resolve(&self, endpoint: &ServiceEndpoint) -> Result<Characteristic> {
        let service_uuid = parse_uuid(&endpoint.service_id)?;
        let characteristic_uuid = parse_uuid(&endpoint.characteristic_id)?;

        self.peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == service_uuid)
            .and_then(|s| {
                s.characteristics
                    .into_iter()
                    .find(|c| c.uuid == characteristic_uuid)
            })
            .ok_or_else(|| Error::CharacteristicNotFound(endpoint.to_string()))
    }
}

fn properties_of(flags: CharPropFlags) -> CharProperties {
    CharProperties {
        readable: flags.contains(CharPropFlags::READ),
        writable_with_response: flags.contains(CharPropFlags::WRITE),
        writable_without_response: flags.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
        notifying: flags.contains(CharPropFlags::NOTIFY),
        indicatable: flags.contains(CharPropFlags::INDICATE),
    }
}

#[async_trait]
impl GattSession for BleSession {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(device_id = %self.device_id))]
    async fn discover_services(&self) -> Result<Vec<ServiceInfo>> {
        self.ensure_discovered().await?;
        let services: Vec<ServiceInfo> = self
            .peripheral
            .services()
            .iter()
            .map(|s| ServiceInfo {
                service_id: display_uuid(&s.uuid),
                primary: s.primary,
            })
            .collect();
        debug!("Found {} services", services.len());
        Ok(services)
    }

    async fn discover_characteristics(&self, service_id: &str) -> Result<Vec<CharacteristicInfo>> {
        self.ensure_discovered().await?;
        let uuid = parse_uuid(service_id)?;
        let service = self
            .peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == uuid)
            .ok_or_else(|| Error::DiscoveryFailed {
                service_id: service_id.to_string(),
                reason: "service not present".to_string(),
            })?;

        Ok(service
            .characteristics
            .iter()
            .map(|c| CharacteristicInfo {
                service_id: display_uuid(&c.service_uuid),
                characteristic_id: display_uuid(&c.uuid),
                properties: properties_of(c.properties),
            })
            .collect())
    }

    async fn write(&self, endpoint: &ServiceEndpoint, payload: &[u8]) -> Result<()> {
        if !self.is_connected().await {
            return Err(Error::NotConnected(self.device_id.clone()));
        }
        self.ensure_discovered().await?;
        let characteristic = self.resolve(endpoint)?;

        let write_type = if characteristic
            .properties
            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE)
        {
            WriteType::WithoutResponse
        } else if characteristic.properties.contains(CharPropFlags::WRITE) {
            WriteType::WithResponse
        } else {
            return Err(Error::NotWritable(endpoint.to_string()));
        };

        debug!("Writing {:?} to {} ({:?})", payload, endpoint, write_type);
        match timeout(
            self.config.write_timeout,
            self.peripheral.write(&characteristic, payload, write_type),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(btleplug::Error::NotConnected)) => {
                Err(Error::NotConnected(self.device_id.clone()))
            }
            Ok(Err(e)) => Err(Error::write_failed(endpoint, e)),
            Err(_) => Err(Error::write_failed(
                endpoint,
                format!("timed out after {:?}", self.config.write_timeout),
            )),
        }
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Disconnecting from {}", self.device_id);
        if let Err(e) = self.peripheral.disconnect().await {
            warn!("Disconnect from {} failed: {}", self.device_id, e);
            return Err(e.into());
        }
        Ok(())
    }
}
