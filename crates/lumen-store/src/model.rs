//! The binding store state model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use lumen_types::{DeviceBinding, Rgb};

use crate::error::{Error, Result};

/// Device bindings plus the active selection.
///
/// `current_device_id` is always either empty or a key of `bindings`.
/// Bindings are kept in key order, so "the first remaining binding" is the
/// one with the smallest device id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingStore {
    #[serde(default)]
    current_device_id: String,
    #[serde(default)]
    bindings: BTreeMap<String, DeviceBinding>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize a store, dropping invalid bindings and repairing a
    /// dangling current device.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut store: BindingStore = serde_json::from_str(json)?;
        store.repair();
        Ok(store)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore the store invariants after loading external data.
    ///
    /// Bindings that are incomplete or filed under a key other than their
    /// own device id are dropped. A current device without a binding is
    /// replaced by the first remaining one. Returns `true` if anything
    /// changed.
    pub fn repair(&mut self) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|key, binding| {
            if binding.device_id != *key {
                warn!(
                    "Dropping binding filed under {} for device {}",
                    key, binding.device_id
                );
                return false;
            }
            if !binding.is_complete() {
                warn!("Dropping incomplete binding for {}", key);
                return false;
            }
            true
        });
        let mut changed = self.bindings.len() != before;

        if !self.current_device_id.is_empty()
            && !self.bindings.contains_key(&self.current_device_id)
        {
            let replacement = self.first_key();
            warn!(
                "Current device {} has no binding, selecting {:?}",
                self.current_device_id, replacement
            );
            self.current_device_id = replacement;
            changed = true;
        }
        changed
    }

    /// Insert or replace the binding for `device_id`.
    ///
    /// The first bound device becomes the current one.
    pub fn set_binding(
        &mut self,
        device_id: impl Into<String>,
        binding: DeviceBinding,
    ) -> Result<()> {
        let device_id = device_id.into();
        if binding.device_id != device_id {
            return Err(Error::BindingMismatch {
                key: device_id,
                device_id: binding.device_id,
            });
        }
        if !binding.is_complete() {
            return Err(Error::IncompleteBinding(device_id));
        }

        debug!(
            "Binding {} -> off {}, color {}",
            device_id, binding.turn_off_endpoint, binding.set_color_endpoint
        );
        if self.current_device_id.is_empty() {
            self.current_device_id = device_id.clone();
        }
        self.bindings.insert(device_id, binding);
        Ok(())
    }

    pub fn get_binding(&self, device_id: &str) -> Option<&DeviceBinding> {
        self.bindings.get(device_id)
    }

    /// Record the colour of the current device.
    pub fn set_color(&mut self, color: Rgb) -> Result<()> {
        let binding = self
            .bindings
            .get_mut(&self.current_device_id)
            .ok_or(Error::NoActiveDevice)?;
        binding.color = color.to_hex();
        Ok(())
    }

    /// Select `device_id` as the current device.
    ///
    /// Unknown ids leave the selection untouched and return `false`.
    pub fn set_current(&mut self, device_id: &str) -> bool {
        if !self.bindings.contains_key(device_id) {
            debug!("Ignoring selection of unbound device {}", device_id);
            return false;
        }
        self.current_device_id = device_id.to_string();
        true
    }

    /// Delete a binding. Removing the current device selects the first
    /// remaining one, or none.
    pub fn remove_binding(&mut self, device_id: &str) -> Option<DeviceBinding> {
        let removed = self.bindings.remove(device_id)?;
        if self.current_device_id == device_id {
            self.current_device_id = self.first_key();
        }
        Some(removed)
    }

    /// The current device id, or `""` when nothing is selected.
    pub fn current_device_id(&self) -> &str {
        &self.current_device_id
    }

    pub fn current_binding(&self) -> Option<&DeviceBinding> {
        self.bindings.get(&self.current_device_id)
    }

    pub fn bindings(&self) -> &BTreeMap<String, DeviceBinding> {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn first_key(&self) -> String {
        self.bindings.keys().next().cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_types::{DEFAULT_COLOR, ServiceEndpoint};
    use proptest::prelude::*;

    fn binding(id: &str) -> DeviceBinding {
        DeviceBinding::new(
            id,
            None,
            ServiceEndpoint::new("180F", "2A19"),
            ServiceEndpoint::new("FFE0", "FFE1"),
        )
    }

    fn invariant_holds(store: &BindingStore) -> bool {
        store.current_device_id().is_empty()
            || store.bindings().contains_key(store.current_device_id())
    }

    #[test]
    fn test_set_then_get_returns_binding_unchanged() {
        let mut store = BindingStore::new();
        let b = binding("AA:BB").with_color("#123456");
        store.set_binding("AA:BB", b.clone()).unwrap();
        assert_eq!(store.get_binding("AA:BB"), Some(&b));
    }

    #[test]
    fn test_first_binding_becomes_current() {
        let mut store = BindingStore::new();
        store.set_binding("B", binding("B")).unwrap();
        store.set_binding("A", binding("A")).unwrap();
        assert_eq!(store.current_device_id(), "B");
    }

    #[test]
    fn test_set_binding_rejects_incomplete() {
        let mut store = BindingStore::new();
        let mut b = binding("A");
        b.set_color_endpoint = ServiceEndpoint::new("FFE0", "");
        assert!(matches!(
            store.set_binding("A", b),
            Err(Error::IncompleteBinding(id)) if id == "A"
        ));
        assert!(store.is_empty());
        assert_eq!(store.current_device_id(), "");
    }

    #[test]
    fn test_set_binding_rejects_mismatched_key() {
        let mut store = BindingStore::new();
        let result = store.set_binding("A", binding("B"));
        assert!(matches!(result, Err(Error::BindingMismatch { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_color_without_current_is_rejected() {
        let mut store = BindingStore::new();
        assert!(matches!(
            store.set_color(Rgb::new(1, 2, 3)),
            Err(Error::NoActiveDevice)
        ));
        assert_eq!(store, BindingStore::new());
    }

    #[test]
    fn test_set_color_updates_current_only() {
        let mut store = BindingStore::new();
        store.set_binding("A", binding("A")).unwrap();
        store.set_binding("B", binding("B")).unwrap();
        store.set_color(Rgb::new(255, 0, 0)).unwrap();
        assert_eq!(store.get_binding("A").unwrap().color, "#ff0000");
        assert_eq!(store.get_binding("B").unwrap().color, DEFAULT_COLOR);
    }

    #[test]
    fn test_set_current_unknown_id_is_noop() {
        let mut store = BindingStore::new();
        store.set_binding("A", binding("A")).unwrap();
        assert!(!store.set_current("unknown-id"));
        assert_eq!(store.current_device_id(), "A");
    }

    #[test]
    fn test_set_current_known_id() {
        let mut store = BindingStore::new();
        store.set_binding("A", binding("A")).unwrap();
        store.set_binding("B", binding("B")).unwrap();
        assert!(store.set_current("B"));
        assert_eq!(store.current_binding().unwrap().device_id, "B");
    }

    #[test]
    fn test_remove_current_selects_remaining() {
        let mut store = BindingStore::new();
        store.set_binding("A", binding("A")).unwrap();
        store.set_binding("B", binding("B")).unwrap();
        assert_eq!(store.current_device_id(), "A");

        let removed = store.remove_binding("A").unwrap();
        assert_eq!(removed.device_id, "A");
        assert_eq!(store.current_device_id(), "B");

        store.remove_binding("B");
        assert_eq!(store.current_device_id(), "");
        assert!(store.current_binding().is_none());
    }

    #[test]
    fn test_remove_other_keeps_current() {
        let mut store = BindingStore::new();
        store.set_binding("B", binding("B")).unwrap();
        store.set_binding("A", binding("A")).unwrap();
        store.set_binding("C", binding("C")).unwrap();
        store.remove_binding("C");
        assert_eq!(store.current_device_id(), "B");
        assert!(store.remove_binding("missing").is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut store = BindingStore::new();
        store.set_binding("AA:BB", binding("AA:BB")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&store.to_json().unwrap()).unwrap();
        assert_eq!(value["currentDeviceId"], "AA:BB");
        assert_eq!(
            value["bindings"]["AA:BB"]["setColorEndpoint"]["serviceId"],
            "FFE0"
        );
    }

    #[test]
    fn test_from_json_repairs_dangling_current() {
        let mut store = BindingStore::new();
        store.set_binding("B", binding("B")).unwrap();
        let json = store.to_json().unwrap().replace(
            "\"currentDeviceId\":\"B\"",
            "\"currentDeviceId\":\"gone\"",
        );
        let loaded = BindingStore::from_json(&json).unwrap();
        assert_eq!(loaded.current_device_id(), "B");
    }

    #[test]
    fn test_from_json_drops_invalid_bindings() {
        let json = r##"{
            "currentDeviceId": "AA",
            "bindings": {
                "AA": {
                    "deviceId": "ZZ",
                    "color": "#ffffff",
                    "turnOffEndpoint": {"serviceId": "180F", "characteristicId": "2A19"},
                    "setColorEndpoint": {"serviceId": "FFE0", "characteristicId": "FFE1"}
                },
                "BB": {
                    "deviceId": "BB",
                    "color": "#ffffff",
                    "turnOffEndpoint": {"serviceId": "180F", "characteristicId": ""},
                    "setColorEndpoint": {"serviceId": "FFE0", "characteristicId": "FFE1"}
                }
            }
        }"##;
        let loaded = BindingStore::from_json(json).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.current_device_id(), "");
        assert!(invariant_holds(&loaded));
    }

    #[test]
    fn test_repair_keeps_valid_bindings() {
        let mut store = BindingStore::new();
        store.set_binding("A", binding("A")).unwrap();
        store.set_binding("B", binding("B")).unwrap();
        store.bindings.insert("C".to_string(), binding("D"));
        store.current_device_id = "C".to_string();

        assert!(store.repair());
        assert_eq!(store.len(), 2);
        assert_eq!(store.current_device_id(), "A");
        assert!(!store.repair());
    }

    #[test]
    fn test_from_json_accepts_empty_object() {
        let loaded = BindingStore::from_json("{}").unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.current_device_id(), "");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(u8),
        Remove(u8),
        Select(u8),
        Color(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..5).prop_map(Op::Set),
            (0u8..5).prop_map(Op::Remove),
            (0u8..5).prop_map(Op::Select),
            any::<u8>().prop_map(Op::Color),
        ]
    }

    proptest! {
        #[test]
        fn prop_current_always_valid(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let mut store = BindingStore::new();
            for op in ops {
                match op {
                    Op::Set(n) => {
                        let id = format!("dev-{n}");
                        store.set_binding(id.clone(), binding(&id)).unwrap();
                    }
                    Op::Remove(n) => {
                        store.remove_binding(&format!("dev-{n}"));
                    }
                    Op::Select(n) => {
                        store.set_current(&format!("dev-{n}"));
                    }
                    Op::Color(v) => {
                        let before = store.clone();
                        if store.set_color(Rgb::new(v, v, v)).is_err() {
                            prop_assert_eq!(&store, &before);
                        }
                    }
                }
                prop_assert!(invariant_holds(&store));
                prop_assert_eq!(store.current_device_id().is_empty(), store.is_empty());
            }
        }
    }
}
