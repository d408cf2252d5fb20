//! Config command implementation.

use anyhow::Result;
use clap::ValueEnum;

use crate::cli::{ConfigAction, ConfigKey};
use crate::config::Config;
use crate::style;

pub fn cmd_config(action: ConfigAction, no_color: bool) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", Config::path().display());
        }
        ConfigAction::Show => {
            let config = Config::load();
            let content = toml::to_string_pretty(&config)?;
            if content.trim().is_empty() {
                println!("(empty configuration)");
            } else {
                print!("{}", content);
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load();
            config.set(key, &value)?;
            config.save()?;
            println!(
                "{}",
                style::format_success(&format!("Set {} = {}", key_name(key), value), no_color)
            );
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load();
            config.unset(key);
            config.save()?;
            println!(
                "{}",
                style::format_success(&format!("Unset {}", key_name(key)), no_color)
            );
        }
    }
    Ok(())
}

/// Key as typed on the command line, e.g. `no-color`.
fn key_name(key: ConfigKey) -> String {
    key.to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_else(|| format!("{:?}", key))
}
