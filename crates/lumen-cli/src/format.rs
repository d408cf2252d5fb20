//! Output formatting utilities for text, JSON, and CSV output.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use lumen_store::BindingStore;
use lumen_types::uuid::{display_uuid, parse_uuid};
use lumen_types::{CharacteristicInfo, DeviceBinding, PeripheralRecord, Rgb};

use crate::cli::StyleMode;
use crate::style;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Omit header row in CSV output.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
    /// Visual styling mode.
    pub style: StyleMode,
}

impl FormatOptions {
    pub fn new(no_color: bool, style: StyleMode) -> Self {
        // Plain mode automatically disables colors for pipe-friendliness
        Self {
            no_color: no_color || style == StyleMode::Plain,
            no_header: false,
            compact: false,
            style,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.style == StyleMode::Plain
    }

    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }

    fn highlight(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("{}", text.cyan())
        }
    }
}

/// Escape a string for CSV output.
/// Wraps the value in quotes if it contains commas, quotes, or newlines.
#[must_use]
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ============================================================================
// Scan formatting
// ============================================================================

pub fn format_scan_json(devices: &[PeripheralRecord], opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct ScanResult<'a> {
        count: usize,
        devices: &'a [PeripheralRecord],
    }

    opts.as_json(&ScanResult {
        count: devices.len(),
        devices,
    })
}

#[must_use]
pub fn format_scan_text(devices: &[PeripheralRecord], opts: &FormatOptions) -> String {
    #[derive(Tabled)]
    struct DeviceRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Signal")]
        signal: String,
        #[tabled(rename = "Identifier")]
        identifier: String,
    }

    if devices.is_empty() {
        return "No BLE devices found.\n".to_string();
    }

    let rows: Vec<DeviceRow> = devices
        .iter()
        .map(|d| DeviceRow {
            name: opts.highlight(d.name.as_deref().unwrap_or("Unknown")),
            signal: if opts.is_plain() {
                d.rssi
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "N/A".to_string())
            } else {
                style::format_signal_bar(d.rssi, opts.no_color)
            },
            identifier: d.id.clone(),
        })
        .collect();

    let mut table = Table::new(rows);
    style::apply_table_style(&mut table, opts.style);
    format!("Found {} device(s)\n\n{}\n", devices.len(), table)
}

#[must_use]
pub fn format_scan_csv(devices: &[PeripheralRecord], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "name,identifier,rssi,connectable\n".to_string()
    };
    for device in devices {
        output.push_str(&format!(
            "{},{},{},{}\n",
            csv_escape(device.name.as_deref().unwrap_or("")),
            csv_escape(&device.id),
            device.rssi.map(|r| r.to_string()).unwrap_or_default(),
            device.is_connectable
        ));
    }
    output
}

// ============================================================================
// Binding formatting
// ============================================================================

fn color_cell(binding: &DeviceBinding, opts: &FormatOptions) -> String {
    match Rgb::parse(&binding.color) {
        Ok(rgb) => style::format_color_swatch(rgb, opts.no_color),
        Err(_) => binding.color.clone(),
    }
}

#[must_use]
pub fn format_bindings_text(store: &BindingStore, opts: &FormatOptions) -> String {
    #[derive(Tabled)]
    struct BindingRow {
        #[tabled(rename = "")]
        current: &'static str,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Identifier")]
        identifier: String,
        #[tabled(rename = "Colour")]
        color: String,
        #[tabled(rename = "Off")]
        off: String,
        #[tabled(rename = "Set colour")]
        set_color: String,
    }

    if store.is_empty() {
        return "No devices bound.\n\nBind one with: lumen setup\n".to_string();
    }

    let rows: Vec<BindingRow> = store
        .bindings()
        .values()
        .map(|b| BindingRow {
            current: if b.device_id == store.current_device_id() {
                "*"
            } else {
                ""
            },
            name: opts.highlight(b.display_name.as_deref().unwrap_or("-")),
            identifier: b.device_id.clone(),
            color: color_cell(b, opts),
            off: b.turn_off_endpoint.to_string(),
            set_color: b.set_color_endpoint.to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    style::apply_table_style(&mut table, opts.style);
    format!("{}\n", table)
}

pub fn format_bindings_json(store: &BindingStore, opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct BindingsResult<'a> {
        current_device_id: Option<&'a str>,
        count: usize,
        bindings: Vec<&'a DeviceBinding>,
    }

    let current = store.current_device_id();
    opts.as_json(&BindingsResult {
        current_device_id: (!current.is_empty()).then_some(current),
        count: store.len(),
        bindings: store.bindings().values().collect(),
    })
}

#[must_use]
pub fn format_bindings_csv(store: &BindingStore, opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "current,identifier,name,color,off_service,off_characteristic,color_service,color_characteristic\n"
            .to_string()
    };
    for b in store.bindings().values() {
        output.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            b.device_id == store.current_device_id(),
            csv_escape(&b.device_id),
            csv_escape(b.display_name.as_deref().unwrap_or("")),
            csv_escape(&b.color),
            csv_escape(&b.turn_off_endpoint.service_id),
            csv_escape(&b.turn_off_endpoint.characteristic_id),
            csv_escape(&b.set_color_endpoint.service_id),
            csv_escape(&b.set_color_endpoint.characteristic_id),
        ));
    }
    output
}

// ============================================================================
// Characteristic formatting
// ============================================================================

/// Short form of a service or characteristic id when it has one.
fn short_id(id: &str) -> String {
    parse_uuid(id)
        .map(|uuid| display_uuid(&uuid))
        .unwrap_or_else(|_| id.to_string())
}

/// One line per characteristic, used for the setup picker.
#[must_use]
pub fn characteristic_label(c: &CharacteristicInfo) -> String {
    format!(
        "{}/{}  [{}]",
        short_id(&c.service_id),
        short_id(&c.characteristic_id),
        c.properties.flags()
    )
}

#[must_use]
pub fn format_characteristics_text(
    characteristics: &[&CharacteristicInfo],
    opts: &FormatOptions,
) -> String {
    #[derive(Tabled)]
    struct CharRow {
        #[tabled(rename = "Service")]
        service: String,
        #[tabled(rename = "Characteristic")]
        characteristic: String,
        #[tabled(rename = "Flags")]
        flags: String,
    }

    if characteristics.is_empty() {
        return "No writable characteristics found.\n".to_string();
    }

    let rows: Vec<CharRow> = characteristics
        .iter()
        .map(|c| CharRow {
            service: short_id(&c.service_id),
            characteristic: opts.highlight(&short_id(&c.characteristic_id)),
            flags: c.properties.flags(),
        })
        .collect();

    let mut table = Table::new(rows);
    style::apply_table_style(&mut table, opts.style);
    format!("{}\n", table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_types::{CharProperties, ServiceEndpoint};

    fn plain() -> FormatOptions {
        FormatOptions::new(true, StyleMode::Plain)
    }

    fn records() -> Vec<PeripheralRecord> {
        let mut lamp = PeripheralRecord::new("AA:BB", Some("Lamp, desk".to_string()));
        lamp.rssi = Some(-60);
        vec![lamp, PeripheralRecord::new("CC:DD", None)]
    }

    fn store() -> BindingStore {
        let mut store = BindingStore::new();
        for id in ["AA:BB", "CC:DD"] {
            store
                .set_binding(
                    id,
                    DeviceBinding::new(
                        id,
                        None,
                        ServiceEndpoint::new("180F", "2A19"),
                        ServiceEndpoint::new("FFE0", "FFE1"),
                    ),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_scan_csv() {
        let csv = format_scan_csv(&records(), &plain());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,identifier,rssi,connectable");
        assert_eq!(lines[1], "\"Lamp, desk\",AA:BB,-60,true");
        assert_eq!(lines[2], ",CC:DD,,true");

        let no_header = format_scan_csv(&records(), &plain().with_no_header(true));
        assert_eq!(no_header.lines().count(), 2);
    }

    #[test]
    fn test_scan_json() {
        let json = format_scan_json(&records(), &plain().with_compact(true)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["count"], 2);
        assert_eq!(value["devices"][0]["id"], "AA:BB");
    }

    #[test]
    fn test_scan_text() {
        let text = format_scan_text(&records(), &plain());
        assert!(text.starts_with("Found 2 device(s)"));
        assert!(text.contains("CC:DD"));
        assert!(format_scan_text(&[], &plain()).contains("No BLE devices found"));
    }

    #[test]
    fn test_bindings_text_marks_current() {
        let text = format_bindings_text(&store(), &plain());
        let current_line = text.lines().find(|l| l.contains("AA:BB")).unwrap();
        assert!(current_line.contains('*'));
        let other_line = text.lines().find(|l| l.contains("CC:DD")).unwrap();
        assert!(!other_line.contains('*'));
        assert!(text.contains("#ff2442"));
    }

    #[test]
    fn test_bindings_json() {
        let json = format_bindings_json(&store(), &plain()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["currentDeviceId"], "AA:BB");
        assert_eq!(value["count"], 2);
        assert_eq!(value["bindings"][1]["setColorEndpoint"]["serviceId"], "FFE0");

        let empty = format_bindings_json(&BindingStore::new(), &plain()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&empty).unwrap();
        assert!(value["currentDeviceId"].is_null());
    }

    #[test]
    fn test_bindings_csv() {
        let csv = format_bindings_csv(&store(), &plain());
        assert!(csv.lines().nth(1).unwrap().starts_with("true,AA:BB,,#ff2442,180F,2A19"));
    }

    #[test]
    fn test_characteristic_label() {
        let c = CharacteristicInfo {
            service_id: "0000ffe0-0000-1000-8000-00805f9b34fb".to_string(),
            characteristic_id: "0000ffe1-0000-1000-8000-00805f9b34fb".to_string(),
            properties: CharProperties {
                writable_without_response: true,
                ..Default::default()
            },
        };
        assert_eq!(characteristic_label(&c), "FFE0/FFE1  [Wn]");
    }
}
