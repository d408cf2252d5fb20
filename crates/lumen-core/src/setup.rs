//! Interactive device setup.
//!
//! [`SetupFlow`] walks one peripheral from selection to a committed
//! [`DeviceBinding`]:
//!
//! ```text
//! Scanning -> Connected -> ServicesListed -> AssigningEndpoints -> Complete
//! ```
//!
//! Choices made along the way live in a [`SetupDraft`]. Nothing reaches the
//! binding store until [`SetupFlow::commit`].

use std::fmt;

use tracing::{info, warn};

use lumen_store::{KeyValueStorage, PersistentBindings};
use lumen_types::{
    CharacteristicInfo, DeviceBinding, EndpointRole, PeripheralRecord, ServiceEndpoint,
};

use crate::discovery::{DiscoveryReport, discover};
use crate::error::{Error, Result};
use crate::transport::{GattSession, GattTransport};

/// Stage of a [`SetupFlow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetupState {
    Scanning,
    Connected,
    ServicesListed,
    AssigningEndpoints,
    Complete,
}

impl fmt::Display for SetupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupState::Scanning => write!(f, "scanning"),
            SetupState::Connected => write!(f, "connected"),
            SetupState::ServicesListed => write!(f, "services listed"),
            SetupState::AssigningEndpoints => write!(f, "assigning endpoints"),
            SetupState::Complete => write!(f, "complete"),
        }
    }
}

/// Choices made during setup, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupDraft {
    pub device: PeripheralRecord,
    pub turn_off: Option<ServiceEndpoint>,
    pub set_color: Option<ServiceEndpoint>,
}

impl SetupDraft {
    pub fn new(device: PeripheralRecord) -> Self {
        Self {
            device,
            turn_off: None,
            set_color: None,
        }
    }

    pub fn endpoint(&self, role: EndpointRole) -> Option<&ServiceEndpoint> {
        match role {
            EndpointRole::TurnOff => self.turn_off.as_ref(),
            EndpointRole::SetColor => self.set_color.as_ref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.turn_off.is_some() && self.set_color.is_some()
    }

    /// Convert into a binding with the default colour.
    ///
    /// Returns `None` while either role is unassigned.
    pub fn into_binding(self) -> Option<DeviceBinding> {
        let turn_off = self.turn_off?;
        let set_color = self.set_color?;
        Some(DeviceBinding::new(
            self.device.id,
            self.device.name,
            turn_off,
            set_color,
        ))
    }
}

/// Drives setup of one device over a [`GattTransport`].
pub struct SetupFlow<'a, T: GattTransport> {
    transport: &'a T,
    state: SetupState,
    session: Option<T::Session>,
    report: Option<DiscoveryReport>,
    draft: Option<SetupDraft>,
}

impl<T: GattTransport> fmt::Debug for SetupFlow<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupFlow")
            .field("state", &self.state)
            .field("connected", &self.session.is_some())
            .field("draft", &self.draft)
            .finish()
    }
}

impl<'a, T: GattTransport> SetupFlow<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            state: SetupState::Scanning,
            session: None,
            report: None,
            draft: None,
        }
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn draft(&self) -> Option<&SetupDraft> {
        self.draft.as_ref()
    }

    pub fn report(&self) -> Option<&DiscoveryReport> {
        self.report.as_ref()
    }

    /// Characteristics that may be assigned to a role.
    pub fn writable_characteristics(&self) -> Vec<&CharacteristicInfo> {
        self.report
            .as_ref()
            .map(|r| r.writable().collect())
            .unwrap_or_default()
    }

    /// Connect to `record` and list its services.
    ///
    /// On connection or discovery failure the flow stays in
    /// [`SetupState::Scanning`] and the error is returned.
    pub async fn select_device(&mut self, record: PeripheralRecord) -> Result<&DiscoveryReport> {
        if self.state != SetupState::Scanning {
            return Err(Error::InvalidState(format!(
                "cannot select a device while {}",
                self.state
            )));
        }

        info!("Setting up {}", record.label());
        let session = self.transport.connect(&record.id).await?;
        self.state = SetupState::Connected;

        let report = match discover(&session).await {
            Ok(report) => report,
            Err(e) => {
                if let Err(disconnect_err) = session.disconnect().await {
                    warn!("Failed to disconnect after discovery error: {}", disconnect_err);
                }
                self.state = SetupState::Scanning;
                return Err(e);
            }
        };

        self.session = Some(session);
        self.draft = Some(SetupDraft::new(record));
        self.state = SetupState::ServicesListed;
        Ok(self.report.insert(report))
    }

    /// Assign a discovered writable characteristic to `role`.
    ///
    /// Assigning a role again replaces the earlier choice.
    pub fn assign(&mut self, role: EndpointRole, endpoint: &ServiceEndpoint) -> Result<()> {
        if !matches!(
            self.state,
            SetupState::ServicesListed | SetupState::AssigningEndpoints
        ) {
            return Err(Error::InvalidState(format!(
                "cannot assign endpoints while {}",
                self.state
            )));
        }
        let (Some(report), Some(draft)) = (self.report.as_ref(), self.draft.as_mut()) else {
            return Err(Error::InvalidState("no device selected".to_string()));
        };

        let characteristic = report
            .find(endpoint)
            .ok_or_else(|| Error::CharacteristicNotFound(endpoint.to_string()))?;
        if !characteristic.properties.is_writable() {
            return Err(Error::NotWritable(endpoint.to_string()));
        }

        let chosen = characteristic.endpoint();
        info!("Assigned {} to {}", chosen, role);
        match role {
            EndpointRole::TurnOff => draft.turn_off = Some(chosen),
            EndpointRole::SetColor => draft.set_color = Some(chosen),
        }
        self.state = SetupState::AssigningEndpoints;
        Ok(())
    }

    /// Both roles have been assigned.
    pub fn can_commit(&self) -> bool {
        self.draft.as_ref().is_some_and(SetupDraft::is_complete)
    }

    /// Persist the draft as a binding and disconnect.
    ///
    /// On failure the draft and connection are kept so the caller can retry
    /// or [`cancel`](Self::cancel).
    pub async fn commit<S: KeyValueStorage>(
        &mut self,
        bindings: &mut PersistentBindings<S>,
    ) -> Result<DeviceBinding> {
        let binding = self
            .draft
            .clone()
            .and_then(SetupDraft::into_binding)
            .ok_or_else(|| Error::InvalidState("both endpoints must be assigned".to_string()))?;

        bindings.set_binding(binding.device_id.clone(), binding.clone())?;
        info!("Saved binding for {}", binding.label());

        self.release().await;
        self.state = SetupState::Complete;
        Ok(binding)
    }

    /// Abandon setup and return to [`SetupState::Scanning`].
    pub async fn cancel(&mut self) {
        self.release().await;
        self.state = SetupState::Scanning;
    }

    async fn release(&mut self) {
        self.draft = None;
        self.report = None;
        if let Some(session) = self.session.take()
            && let Err(e) = session.disconnect().await
        {
            warn!("Failed to disconnect {}: {}", session.device_id(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPeripheral, MockService, MockTransport, write_without_response};
    use lumen_store::MemoryStorage;

    fn transport() -> MockTransport {
        MockTransport::new().with_peripheral(MockPeripheral::led_controller("AA:BB", "Lamp"))
    }

    fn lamp() -> PeripheralRecord {
        PeripheralRecord::new("AA:BB", Some("Lamp".to_string()))
    }

    #[tokio::test]
    async fn test_full_setup() {
        let transport = transport();
        let mut bindings = PersistentBindings::open(MemoryStorage::new()).unwrap();
        let mut flow = SetupFlow::new(&transport);

        let report = flow.select_device(lamp()).await.unwrap();
        assert_eq!(report.writable().count(), 2);
        assert_eq!(flow.state(), SetupState::ServicesListed);
        assert!(!flow.can_commit());

        flow.assign(EndpointRole::TurnOff, &ServiceEndpoint::new("180f", "2a19"))
            .unwrap();
        assert_eq!(flow.state(), SetupState::AssigningEndpoints);
        assert!(!flow.can_commit());
        flow.assign(EndpointRole::SetColor, &ServiceEndpoint::new("FFE0", "FFE1"))
            .unwrap();
        assert!(flow.can_commit());

        let binding = flow.commit(&mut bindings).await.unwrap();
        assert_eq!(binding.turn_off_endpoint, ServiceEndpoint::new("180F", "2A19"));
        assert_eq!(binding.display_name.as_deref(), Some("Lamp"));
        assert_eq!(flow.state(), SetupState::Complete);
        assert!(flow.draft().is_none());
        assert!(!transport.is_connected("AA:BB").await);

        assert_eq!(bindings.store().current_device_id(), "AA:BB");
        assert_eq!(bindings.store().get_binding("AA:BB"), Some(&binding));
    }

    #[tokio::test]
    async fn test_incomplete_draft_cannot_commit() {
        let transport = transport();
        let mut bindings = PersistentBindings::open(MemoryStorage::new()).unwrap();
        let mut flow = SetupFlow::new(&transport);
        flow.select_device(lamp()).await.unwrap();
        flow.assign(EndpointRole::SetColor, &ServiceEndpoint::new("FFE0", "FFE1"))
            .unwrap();

        let result = flow.commit(&mut bindings).await;
        assert!(matches!(result, Err(Error::InvalidState(_))));
        assert!(bindings.store().is_empty());
        assert_eq!(flow.state(), SetupState::AssigningEndpoints);
        assert!(transport.is_connected("AA:BB").await);
    }

    #[tokio::test]
    async fn test_assign_rejects_read_only_and_unknown() {
        let transport = transport();
        let mut flow = SetupFlow::new(&transport);
        flow.select_device(lamp()).await.unwrap();

        assert!(matches!(
            flow.assign(EndpointRole::TurnOff, &ServiceEndpoint::new("180A", "2A29")),
            Err(Error::NotWritable(_))
        ));
        assert!(matches!(
            flow.assign(EndpointRole::TurnOff, &ServiceEndpoint::new("FFE0", "FFE9")),
            Err(Error::CharacteristicNotFound(_))
        ));
        assert_eq!(flow.state(), SetupState::ServicesListed);
        assert_eq!(flow.draft().and_then(|d| d.turn_off.as_ref()), None);
    }

    #[tokio::test]
    async fn test_connect_failure_stays_scanning() {
        let transport = transport();
        transport.set_fail_connect(true);
        let mut flow = SetupFlow::new(&transport);

        assert!(flow.select_device(lamp()).await.is_err());
        assert_eq!(flow.state(), SetupState::Scanning);

        transport.set_fail_connect(false);
        assert!(flow.select_device(lamp()).await.is_ok());
    }

    #[tokio::test]
    async fn test_partial_discovery_keeps_usable_services() {
        let peripheral = MockPeripheral::new("AA:BB", None)
            .service(MockService::new("FFE0").characteristic("FFE1", write_without_response()))
            .service(
                MockService::new("FFF0")
                    .characteristic("FFF1", write_without_response())
                    .failing(),
            );
        let transport = MockTransport::new().with_peripheral(peripheral);
        let mut flow = SetupFlow::new(&transport);

        let report = flow
            .select_device(PeripheralRecord::new("AA:BB", None))
            .await
            .unwrap();
        assert!(report.is_partial());
        assert_eq!(flow.writable_characteristics().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_disconnects() {
        let transport = transport();
        let mut flow = SetupFlow::new(&transport);
        flow.select_device(lamp()).await.unwrap();
        assert!(transport.is_connected("AA:BB").await);

        flow.cancel().await;
        assert_eq!(flow.state(), SetupState::Scanning);
        assert!(flow.draft().is_none());
        assert!(flow.report().is_none());
        assert!(!transport.is_connected("AA:BB").await);
    }

    #[tokio::test]
    async fn test_select_twice_is_invalid() {
        let transport = transport();
        let mut flow = SetupFlow::new(&transport);
        flow.select_device(lamp()).await.unwrap();
        assert!(matches!(
            flow.select_device(lamp()).await,
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_draft_into_binding() {
        let mut draft = SetupDraft::new(lamp());
        draft.turn_off = Some(ServiceEndpoint::new("180F", "2A19"));
        assert!(draft.clone().into_binding().is_none());

        draft.set_color = Some(ServiceEndpoint::new("FFE0", "FFE1"));
        let binding = draft.into_binding().unwrap();
        assert!(binding.is_complete());
        assert_eq!(binding.color, lumen_types::DEFAULT_COLOR);
    }
}
