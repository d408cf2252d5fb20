//! Error types for value parsing in lumen-types.

use thiserror::Error;

/// Errors that can occur when parsing colours, identifiers, and endpoints.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in lumen-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The colour string is not in a recognised format.
    #[error("Invalid color '{0}': expected #rrggbb, #rgb, rgb(r, g, b) or r,g,b")]
    InvalidColor(String),

    /// The identifier is neither a 16/32-bit short form nor a full UUID.
    #[error("Invalid UUID '{0}'")]
    InvalidUuid(String),

    /// The endpoint string is not `SERVICE/CHARACTERISTIC`.
    #[error("Invalid endpoint '{0}': expected SERVICE/CHARACTERISTIC")]
    InvalidEndpoint(String),
}

/// Result type alias using lumen-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
