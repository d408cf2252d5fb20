//! Peripheral identifier helpers for btleplug.

use btleplug::platform::PeripheralId;

/// Placeholder address reported by platforms that hide MAC addresses.
const HIDDEN_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a plain string.
///
/// btleplug's `Debug` output wraps the value in `PeripheralId(...)`; this
/// strips the wrapper so the identifier can be stored and typed back in.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    strip_wrapper(&format!("{:?}", id)).to_string()
}

/// The identifier a peripheral is stored under.
///
/// macOS reports every address as zeros, so the CoreBluetooth UUID is used
/// there; elsewhere the MAC address is stable and used directly.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if address == HIDDEN_ADDRESS {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Compare a stored identifier with one typed by a user.
///
/// Case and `:` separators are ignored, so `aabbccddeeff` matches
/// `AA:BB:CC:DD:EE:FF`.
pub fn identifiers_match(a: &str, b: &str) -> bool {
    let normalize = |s: &str| s.trim().replace(':', "").to_ascii_lowercase();
    !a.trim().is_empty() && normalize(a) == normalize(b)
}

fn strip_wrapper(debug: &str) -> &str {
    debug
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
}
