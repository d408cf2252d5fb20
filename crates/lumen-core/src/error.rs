//! Error types for lumen-core.
//!
//! Every failure a user can trigger maps onto one of a small set of
//! [`FailureKind`]s, each with its own message. Nothing here is retried
//! automatically; the triggering operation is abandoned and the caller
//! returns to its previous state.
//!
//! | Error | Kind |
//! |-------|------|
//! | [`Error::PermissionDenied`] | [`FailureKind::PermissionDenied`] |
//! | [`Error::TransportOff`] | [`FailureKind::TransportOff`] |
//! | [`Error::DeviceNotFound`], [`Error::ConnectionFailed`], [`Error::Timeout`], [`Error::DiscoveryFailed`] | [`FailureKind::ConnectionFailure`] |
//! | [`Error::NotConnected`] | [`FailureKind::NotConnected`] |
//! | [`Error::WriteFailed`], [`Error::CharacteristicNotFound`], [`Error::NotWritable`] | [`FailureKind::WriteFailure`] |

use std::time::Duration;

use thiserror::Error;

use crate::transport::AdapterState;

/// Errors that can occur while discovering, binding and controlling lights.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth access was refused by the operating system.
    #[error("Bluetooth permission denied")]
    PermissionDenied,

    /// The radio is switched off or missing.
    #[error("Bluetooth adapter is {0}")]
    TransportOff(AdapterState),

    /// Device not found among known peripherals.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Connecting to the device failed.
    #[error("Connection to {device_id} failed: {reason}")]
    ConnectionFailed { device_id: String, reason: String },

    /// Operation attempted without a live session to the device.
    #[error("Not connected to device {0}")]
    NotConnected(String),

    /// Characteristics of one service could not be listed.
    #[error("Discovery of service {service_id} failed: {reason}")]
    DiscoveryFailed { service_id: String, reason: String },

    /// The endpoint does not exist on the connected device.
    #[error("Characteristic not found: {0}")]
    CharacteristicNotFound(String),

    /// The endpoint exists but accepts no writes.
    #[error("Characteristic {0} is not writable")]
    NotWritable(String),

    /// The transport rejected or failed a characteristic write.
    #[error("Write to {endpoint} failed: {reason}")]
    WriteFailed { endpoint: String, reason: String },

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// A setup step was called out of order.
    #[error("Invalid setup state: {0}")]
    InvalidState(String),

    /// Identifier or colour could not be parsed.
    #[error(transparent)]
    Parse(#[from] lumen_types::ParseError),

    /// Binding store error.
    #[error(transparent)]
    Store(#[from] lumen_store::Error),
}

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    PermissionDenied,
    TransportOff,
    ConnectionFailure,
    NotConnected,
    WriteFailure,
    Other,
}

impl FailureKind {
    /// Message shown to the user for this kind of failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::PermissionDenied => {
                "Bluetooth permission not granted; allow access and try again"
            }
            FailureKind::TransportOff => "Bluetooth is turned off; enable it and try again",
            FailureKind::ConnectionFailure => "Could not connect to the device",
            FailureKind::NotConnected => "Connect to the device first",
            FailureKind::WriteFailure => "Unknown error while writing to the device",
            FailureKind::Other => "Unexpected error",
        }
    }
}

impl Error {
    /// Classify this error for presentation.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Bluetooth(e) => match e {
                btleplug::Error::PermissionDenied => FailureKind::PermissionDenied,
                btleplug::Error::NotConnected => FailureKind::NotConnected,
                btleplug::Error::DeviceNotFound => FailureKind::ConnectionFailure,
                _ => FailureKind::Other,
            },
            Error::PermissionDenied => FailureKind::PermissionDenied,
            Error::TransportOff(_) => FailureKind::TransportOff,
            Error::DeviceNotFound(_)
            | Error::ConnectionFailed { .. }
            | Error::Timeout { .. }
            | Error::DiscoveryFailed { .. } => FailureKind::ConnectionFailure,
            Error::NotConnected(_) => FailureKind::NotConnected,
            Error::WriteFailed { .. }
            | Error::CharacteristicNotFound(_)
            | Error::NotWritable(_) => FailureKind::WriteFailure,
            Error::Cancelled | Error::InvalidState(_) | Error::Parse(_) | Error::Store(_) => {
                FailureKind::Other
            }
        }
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn connection_failed(device_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::ConnectionFailed {
            device_id: device_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write_failed(endpoint: impl ToString, reason: impl ToString) -> Self {
        Self::WriteFailed {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using lumen-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
