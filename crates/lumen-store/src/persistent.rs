//! Write-through persistence for the binding store.

use tracing::{debug, info};

use lumen_types::{DeviceBinding, Rgb};

use crate::BINDINGS_KEY;
use crate::error::Result;
use crate::model::BindingStore;
use crate::storage::KeyValueStorage;

/// A [`BindingStore`] that saves itself after every successful mutation.
///
/// The store is read from storage once, in [`open`](Self::open). Mutations
/// rejected by validation are not written, and a mutation whose write fails
/// leaves the in-memory state as it was.
#[derive(Debug)]
pub struct PersistentBindings<S: KeyValueStorage> {
    storage: S,
    store: BindingStore,
}

impl<S: KeyValueStorage> PersistentBindings<S> {
    /// Load the store from `storage`, starting empty if nothing was saved.
    pub fn open(storage: S) -> Result<Self> {
        let store = match storage.get(BINDINGS_KEY)? {
            Some(json) => BindingStore::from_json(&json)?,
            None => BindingStore::new(),
        };
        info!(
            "Loaded {} binding(s), current device {:?}",
            store.len(),
            store.current_device_id()
        );
        Ok(Self { storage, store })
    }

    /// Read-only view of the state.
    pub fn store(&self) -> &BindingStore {
        &self.store
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn set_binding(
        &mut self,
        device_id: impl Into<String>,
        binding: DeviceBinding,
    ) -> Result<()> {
        let mut next = self.store.clone();
        next.set_binding(device_id, binding)?;
        self.commit(next)
    }

    pub fn set_color(&mut self, color: Rgb) -> Result<()> {
        let mut next = self.store.clone();
        next.set_color(color)?;
        self.commit(next)
    }

    /// Returns `Ok(false)` without writing when `device_id` is not bound.
    pub fn set_current(&mut self, device_id: &str) -> Result<bool> {
        let mut next = self.store.clone();
        if !next.set_current(device_id) {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    pub fn remove_binding(&mut self, device_id: &str) -> Result<Option<DeviceBinding>> {
        let mut next = self.store.clone();
        let removed = next.remove_binding(device_id);
        if removed.is_some() {
            self.commit(next)?;
        }
        Ok(removed)
    }

    /// Write the whole store under [`BINDINGS_KEY`].
    pub fn flush(&self) -> Result<()> {
        write_store(&self.storage, &self.store)
    }

    /// Persist `next` and only then make it the in-memory state.
    fn commit(&mut self, next: BindingStore) -> Result<()> {
        write_store(&self.storage, &next)?;
        self.store = next;
        Ok(())
    }
}

fn write_store<S: KeyValueStorage>(storage: &S, store: &BindingStore) -> Result<()> {
    let json = store.to_json()?;
    storage.set(BINDINGS_KEY, &json)?;
    debug!("Persisted {} binding(s)", store.len());
    Ok(())
}
