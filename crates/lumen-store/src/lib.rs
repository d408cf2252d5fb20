//! Durable device bindings for BLE LED devices.
//!
//! This crate holds the user's device-to-characteristic bindings and the
//! currently selected device, and persists them through a small key-value
//! interface.
//!
//! # Features
//!
//! - [`BindingStore`]: the in-memory state with its invariants
//! - [`KeyValueStorage`] with file-backed and in-memory implementations
//! - [`PersistentBindings`]: write-through wrapper that saves after every change
//!
//! # Example
//!
//! ```no_run
//! use lumen_store::{FileStorage, PersistentBindings};
//!
//! let storage = FileStorage::new(lumen_store::default_data_dir());
//! let bindings = PersistentBindings::open(storage)?;
//!
//! for binding in bindings.store().bindings().values() {
//!     println!("{} -> {}", binding.device_id, binding.set_color_endpoint);
//! }
//! # Ok::<(), lumen_store::Error>(())
//! ```

mod error;
mod model;
mod persistent;
mod storage;

pub use error::{Error, Result};
pub use model::BindingStore;
pub use persistent::PersistentBindings;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

/// Storage key holding the serialized [`BindingStore`].
pub const BINDINGS_KEY: &str = "lumen.bindings";

/// Default data directory following platform conventions.
///
/// - Linux: `~/.local/share/lumen`
/// - macOS: `~/Library/Application Support/lumen`
/// - Windows: `C:\Users\<user>\AppData\Local\lumen`
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("lumen")
}
