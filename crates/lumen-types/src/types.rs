//! Core types for device discovery and bindings.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::color::DEFAULT_COLOR;
use crate::error::ParseError;
use crate::uuid::same_id;

/// A peripheral reported during a scan.
///
/// Records are keyed by `id` and live only for the scan session that
/// produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PeripheralRecord {
    /// Platform identifier (MAC address on Linux/Windows, UUID on macOS).
    pub id: String,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Whether the advertisement marked the device as connectable.
    pub is_connectable: bool,
    /// Last observed signal strength in dBm.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rssi: Option<i16>,
}

impl PeripheralRecord {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            is_connectable: true,
            rssi: None,
        }
    }

    /// The name to show to a user, falling back to the identifier.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// One GATT characteristic inside one GATT service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ServiceEndpoint {
    pub service_id: String,
    pub characteristic_id: String,
}

impl ServiceEndpoint {
    pub fn new(service_id: impl Into<String>, characteristic_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            characteristic_id: characteristic_id.into(),
        }
    }

    /// Both identifiers are present.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.service_id.trim().is_empty() && !self.characteristic_id.trim().is_empty()
    }

    /// Whether two endpoints address the same characteristic, ignoring
    /// short/long UUID spelling.
    #[must_use]
    pub fn matches(&self, other: &ServiceEndpoint) -> bool {
        same_id(&self.service_id, &other.service_id)
            && same_id(&self.characteristic_id, &other.characteristic_id)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_id, self.characteristic_id)
    }
}

impl FromStr for ServiceEndpoint {
    type Err = ParseError;

    /// Parse `SERVICE/CHARACTERISTIC`, e.g. `FFE0/FFE1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (service, characteristic) = s
            .split_once('/')
            .ok_or_else(|| ParseError::InvalidEndpoint(s.to_string()))?;
        let endpoint = ServiceEndpoint::new(service.trim(), characteristic.trim());
        if !endpoint.is_set() || characteristic.contains('/') {
            return Err(ParseError::InvalidEndpoint(s.to_string()));
        }
        Ok(endpoint)
    }
}

/// Which control a characteristic is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EndpointRole {
    /// Receives the single-byte off command.
    TurnOff,
    /// Receives the three-byte colour command.
    SetColor,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::TurnOff => write!(f, "turn off"),
            EndpointRole::SetColor => write!(f, "set color"),
        }
    }
}

/// A device's persisted control mapping.
///
/// Serializes as
/// `{deviceId, displayName, color, turnOffEndpoint, setColorEndpoint}`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceBinding {
    pub device_id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub display_name: Option<String>,
    pub color: String,
    pub turn_off_endpoint: ServiceEndpoint,
    pub set_color_endpoint: ServiceEndpoint,
}

impl DeviceBinding {
    /// Create a binding with the default colour.
    pub fn new(
        device_id: impl Into<String>,
        display_name: Option<String>,
        turn_off_endpoint: ServiceEndpoint,
        set_color_endpoint: ServiceEndpoint,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            display_name,
            color: DEFAULT_COLOR.to_string(),
            turn_off_endpoint,
            set_color_endpoint,
        }
    }

    /// Set the stored colour.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Both endpoints are set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.turn_off_endpoint.is_set() && self.set_color_endpoint.is_set()
    }

    /// Endpoint bound to `role`.
    #[must_use]
    pub fn endpoint(&self, role: EndpointRole) -> &ServiceEndpoint {
        match role {
            EndpointRole::TurnOff => &self.turn_off_endpoint,
            EndpointRole::SetColor => &self.set_color_endpoint,
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.device_id)
    }
}

/// Capability flags of a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CharProperties {
    pub readable: bool,
    pub writable_with_response: bool,
    pub writable_without_response: bool,
    pub notifying: bool,
    pub indicatable: bool,
}

impl CharProperties {
    /// Accepts writes of either kind.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable_with_response || self.writable_without_response
    }

    /// Short flag string such as `R,W,Wn`.
    #[must_use]
    pub fn flags(&self) -> String {
        let mut flags = Vec::new();
        if self.readable {
            flags.push("R");
        }
        if self.writable_with_response {
            flags.push("W");
        }
        if self.writable_without_response {
            flags.push("Wn");
        }
        if self.notifying {
            flags.push("N");
        }
        if self.indicatable {
            flags.push("I");
        }
        flags.join(",")
    }
}

/// A discovered characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CharacteristicInfo {
    pub service_id: String,
    pub characteristic_id: String,
    pub properties: CharProperties,
}

impl CharacteristicInfo {
    #[must_use]
    pub fn endpoint(&self) -> ServiceEndpoint {
        ServiceEndpoint::new(&self.service_id, &self.characteristic_id)
    }
}

/// A discovered primary service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ServiceInfo {
    pub service_id: String,
    pub primary: bool,
}
