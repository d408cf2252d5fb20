//! Bluetooth UUID helpers.
//!
//! GATT identifiers show up in two shapes: the 16-bit (or 32-bit) short
//! forms assigned by the Bluetooth SIG, such as `180F`, and full 128-bit
//! UUIDs. Short forms are aliases inside the Bluetooth base UUID
//! `0000xxxx-0000-1000-8000-00805f9b34fb`, so two identifiers are compared
//! after expanding both.

use uuid::{Uuid, uuid};

use crate::error::{ParseError, ParseResult};

/// The Bluetooth base UUID that short identifiers expand into.
pub const BLUETOOTH_BASE_UUID: Uuid = uuid!("00000000-0000-1000-8000-00805f9b34fb");

/// Mask selecting the part of a UUID that a short identifier replaces.
const SHORT_MASK: u128 = 0xFFFF_FFFF << 96;

// --- Standard BLE Service UUIDs ---

/// Generic Access Profile (GAP) service.
pub const GAP_SERVICE: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");

/// Generic Attribute Profile (GATT) service.
pub const GATT_SERVICE: Uuid = uuid!("00001801-0000-1000-8000-00805f9b34fb");

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

/// Battery level characteristic.
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

/// Expand a 32-bit short identifier into a full UUID.
#[must_use]
pub const fn from_short(short: u32) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID.as_u128() | ((short as u128) << 96))
}

/// Return the short identifier if `uuid` lives inside the Bluetooth base UUID.
#[must_use]
pub fn short_form(uuid: &Uuid) -> Option<u32> {
    let value = uuid.as_u128();
    if value & !SHORT_MASK == BLUETOOTH_BASE_UUID.as_u128() {
        Some((value >> 96) as u32)
    } else {
        None
    }
}

/// Parse a GATT identifier.
///
/// Accepts `FFE0`, `0xFFE0`, `0000FFE0` and full hyphenated or simple UUIDs.
///
/// # Examples
///
/// ```
/// use lumen_types::uuid::{parse_uuid, BATTERY_SERVICE};
///
/// assert_eq!(parse_uuid("180F").unwrap(), BATTERY_SERVICE);
/// assert_eq!(parse_uuid("0000180f-0000-1000-8000-00805f9b34fb").unwrap(), BATTERY_SERVICE);
/// ```
pub fn parse_uuid(s: &str) -> ParseResult<Uuid> {
    let trimmed = s.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if (hex.len() == 4 || hex.len() == 8) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        let short =
            u32::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidUuid(s.to_string()))?;
        return Ok(from_short(short));
    }

    Uuid::parse_str(hex).map_err(|_| ParseError::InvalidUuid(s.to_string()))
}

/// Render a UUID for display, preferring the short form when one exists.
#[must_use]
pub fn display_uuid(uuid: &Uuid) -> String {
    match short_form(uuid) {
        Some(short) if short <= 0xFFFF => format!("{:04X}", short),
        Some(short) => format!("{:08X}", short),
        None => uuid.to_string(),
    }
}

/// Compare two GATT identifier strings.
///
/// Both sides are parsed and compared as UUIDs, so `"ffe1"` equals
/// `"0000FFE1-0000-1000-8000-00805F9B34FB"`. Identifiers that do not parse
/// fall back to a case-insensitive string comparison.
#[must_use]
pub fn same_id(a: &str, b: &str) -> bool {
    match (parse_uuid(a), parse_uuid(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}
