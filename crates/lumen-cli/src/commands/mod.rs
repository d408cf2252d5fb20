//! Command implementations for the CLI.

mod config;
mod control;
mod devices;
mod http;
mod scan;
mod setup;

pub use config::cmd_config;
pub use control::{cmd_color, cmd_off};
pub use devices::{cmd_devices, cmd_remove, cmd_use};
pub use http::cmd_http;
pub use scan::cmd_scan;
pub use setup::{SetupArgs, cmd_setup};
