//! Service and characteristic discovery.
//!
//! Discovery is best-effort per service: a service whose characteristics
//! cannot be listed is left out of the report and recorded as a failure.

use tracing::{debug, info, warn};

use lumen_types::{CharacteristicInfo, ServiceEndpoint, ServiceInfo};

use crate::error::Result;
use crate::transport::GattSession;

/// A service together with its characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    pub service: ServiceInfo,
    pub characteristics: Vec<CharacteristicInfo>,
}

/// A service whose characteristics could not be listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFailure {
    pub service_id: String,
    pub reason: String,
}

/// Result of discovering one peripheral.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub services: Vec<DiscoveredService>,
    pub failures: Vec<DiscoveryFailure>,
}

impl DiscoveryReport {
    /// Some services could not be listed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn characteristics(&self) -> impl Iterator<Item = &CharacteristicInfo> {
        self.services.iter().flat_map(|s| s.characteristics.iter())
    }

    /// Characteristics that accept a write with or without response.
    pub fn writable(&self) -> impl Iterator<Item = &CharacteristicInfo> {
        self.characteristics().filter(|c| c.properties.is_writable())
    }

    /// Find the characteristic addressed by `endpoint`.
    pub fn find(&self, endpoint: &ServiceEndpoint) -> Option<&CharacteristicInfo> {
        self.characteristics().find(|c| c.endpoint().matches(endpoint))
    }
}

/// Discover every service and its characteristics.
///
/// Fails only when the service list itself cannot be read.
#[tracing::instrument(level = "info", skip_all, fields(device_id = %session.device_id()))]
pub async fn discover<S: GattSession + ?Sized>(session: &S) -> Result<DiscoveryReport> {
    let services = session.discover_services().await?;
    let mut report = DiscoveryReport::default();

    for service in services {
        match session.discover_characteristics(&service.service_id).await {
            Ok(characteristics) => {
                debug!(
                    "Service {}: {} characteristic(s)",
                    service.service_id,
                    characteristics.len()
                );
                report.services.push(DiscoveredService {
                    service,
                    characteristics,
                });
            }
            Err(e) => {
                warn!("Skipping service {}: {}", service.service_id, e);
                report.failures.push(DiscoveryFailure {
                    service_id: service.service_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Discovered {} service(s), {} writable characteristic(s), {} failure(s)",
        report.services.len(),
        report.writable().count(),
        report.failures.len()
    );
    Ok(report)
}
