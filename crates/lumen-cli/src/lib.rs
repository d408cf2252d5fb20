//! Command-line interface for BLE LED controllers.
//!
//! The `lumen` binary finds nearby lights, binds each one's turn-off and
//! set-colour characteristics, and then drives the bound lights by name.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scan` | Scan for nearby BLE devices |
//! | `setup` | Bind a device's two control characteristics |
//! | `devices` | List bound devices |
//! | `use` | Make a bound device the current one |
//! | `remove` | Delete a binding |
//! | `color` | Set the colour of the current device |
//! | `off` | Turn the current device off |
//! | `http` | Drive a light through its HTTP bridge |
//! | `config` | Manage CLI configuration |
//! | `completions` | Generate shell completions |
//!
//! # Output Formats
//!
//! `scan` and `devices` support text (default), JSON and CSV.
//!
//! # Configuration
//!
//! Settings live in `~/.config/lumen/config.toml` (or the platform
//! equivalent): `timeout`, `url`, `format`, `no_color` and `data_dir`.
//! Bindings are stored separately, as `lumen.bindings.json` in the data
//! directory.
//!
//! # Environment Variables
//!
//! - `LUMEN_CONFIG`: Config file location
//! - `LUMEN_DATA_DIR`: Directory holding the bindings
//! - `LUMEN_HTTP_URL`: HTTP bridge base URL
//! - `LUMEN_STYLE`: `rich` or `plain`
//! - `NO_COLOR`: Disable colored output when set
//!
//! # Examples
//!
//! Bind a light non-interactively:
//! ```bash
//! lumen setup --device AA:BB:CC:DD:EE:FF --off FFE0/FFE2 --color FFE0/FFE1
//! ```
//!
//! Set its colour:
//! ```bash
//! lumen color "#00ff00"
//! ```

// The binary lives in main.rs; this target only re-exports the libraries.
pub use lumen_core;
pub use lumen_store;
pub use lumen_types;
