//! Peripherals seen during the current scan.

use std::collections::HashMap;

use lumen_types::PeripheralRecord;

/// In-memory directory of scanned peripherals, keyed by id.
///
/// [`values`](Self::values) yields records in the order they were first
/// seen. That order carries no meaning beyond being stable within a scan.
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    order: Vec<String>,
    records: HashMap<String, PeripheralRecord>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, or refresh the one already stored under its id.
    ///
    /// A refresh keeps the record's position and only updates transient
    /// fields; a missing name in a later advertisement does not erase a known
    /// one. Returns `true` if the id was new.
    pub fn add_device(&mut self, record: PeripheralRecord) -> bool {
        match self.records.get_mut(&record.id) {
            Some(existing) => {
                existing.is_connectable = record.is_connectable;
                if record.rssi.is_some() {
                    existing.rssi = record.rssi;
                }
                if record.name.is_some() {
                    existing.name = record.name;
                }
                false
            }
            None => {
                self.order.push(record.id.clone());
                self.records.insert(record.id.clone(), record);
                true
            }
        }
    }

    /// Remove every record.
    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
    }

    pub fn get(&self, id: &str) -> Option<&PeripheralRecord> {
        self.records.get(id)
    }

    pub fn values(&self) -> impl Iterator<Item = &PeripheralRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(id: &str, name: Option<&str>) -> PeripheralRecord {
        PeripheralRecord::new(id, name.map(str::to_string))
    }

    #[test]
    fn test_clear_twice_is_empty() {
        let mut directory = DeviceDirectory::new();
        directory.add_device(record("AA:BB", Some("Lamp")));
        directory.clear();
        assert!(directory.is_empty());
        directory.clear();
        assert!(directory.is_empty());
        assert_eq!(directory.values().count(), 0);
    }

    #[test]
    fn test_refresh_keeps_position_and_name() {
        let mut directory = DeviceDirectory::new();
        assert!(directory.add_device(record("A", Some("First"))));
        assert!(directory.add_device(record("B", None)));

        let mut refreshed = record("A", None);
        refreshed.rssi = Some(-40);
        assert!(!directory.add_device(refreshed));

        let ids: Vec<_> = directory.values().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["A", "B"]);
        let a = directory.get("A").unwrap();
        assert_eq!(a.name.as_deref(), Some("First"));
        assert_eq!(a.rssi, Some(-40));
    }

    #[test]
    fn test_later_name_fills_in() {
        let mut directory = DeviceDirectory::new();
        directory.add_device(record("A", None));
        directory.add_device(record("A", Some("Lamp")));
        assert_eq!(directory.get("A").unwrap().label(), "Lamp");
        assert_eq!(directory.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_values_are_unique_first_seen_order(ids in proptest::collection::vec(0u8..8, 0..50)) {
            let mut directory = DeviceDirectory::new();
            let mut expected: Vec<String> = Vec::new();
            for n in ids {
                let id = format!("dev-{n}");
                if !expected.contains(&id) {
                    expected.push(id.clone());
                }
                directory.add_device(record(&id, None));
            }
            let actual: Vec<String> = directory.values().map(|r| r.id.clone()).collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
