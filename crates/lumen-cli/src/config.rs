//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::cli::{ConfigKey, OutputFormat};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "LUMEN_CONFIG";

/// Default scan duration in seconds.
pub const DEFAULT_SCAN_TIMEOUT: u64 = 5;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default scan duration in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// HTTP bridge base URL
    #[serde(default)]
    pub url: Option<String>,

    /// Default output format
    #[serde(default)]
    pub format: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Directory holding the device bindings
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lumen")
            .join("config.toml")
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => eprintln!("Warning: Failed to parse config: {}", e),
            },
            Err(e) => eprintln!("Warning: Failed to read config: {}", e),
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Set `key` from its command-line representation.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        match key {
            ConfigKey::Timeout => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("'{}' is not a valid number of seconds", value))?;
                if secs == 0 {
                    bail!("Scan timeout must be at least 1 second");
                }
                self.timeout = Some(secs);
            }
            ConfigKey::Url => {
                let url = value.trim().trim_end_matches('/');
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    bail!("URL must start with http:// or https://, got: {}", value);
                }
                self.url = Some(url.to_string());
            }
            ConfigKey::Format => {
                <OutputFormat as clap::ValueEnum>::from_str(value, true).map_err(|_| {
                    anyhow::anyhow!("Invalid format '{}'. Valid values: text, json, csv", value)
                })?;
                self.format = Some(value.to_lowercase());
            }
            ConfigKey::NoColor => self.no_color = parse_bool(value)?,
            ConfigKey::DataDir => self.data_dir = Some(PathBuf::from(value)),
        }
        Ok(())
    }

    /// Reset `key` to its default.
    pub fn unset(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::Timeout => self.timeout = None,
            ConfigKey::Url => self.url = None,
            ConfigKey::Format => self.format = None,
            ConfigKey::NoColor => self.no_color = false,
            ConfigKey::DataDir => self.data_dir = None,
        }
    }

    /// Configured output format, if it names a valid one.
    pub fn output_format(&self) -> Option<OutputFormat> {
        let format = self.format.as_deref()?;
        <OutputFormat as clap::ValueEnum>::from_str(format, true).ok()
    }
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!(
            "Invalid boolean value '{}'. Use: true/false, yes/no, on/off, 1/0",
            s
        ),
    }
}

/// Resolve timeout: use provided value, fall back to config, then default
pub fn resolve_timeout(cmd_timeout: u64, config: &Config, default: u64) -> u64 {
    // If the command timeout differs from clap's default, use it
    if cmd_timeout != default {
        cmd_timeout
    } else {
        config.timeout.unwrap_or(default)
    }
}

/// Resolve output format: an explicit non-default flag wins over config.
pub fn resolve_format(cmd_format: OutputFormat, config: &Config) -> OutputFormat {
    if cmd_format != OutputFormat::default() {
        cmd_format
    } else {
        config.output_format().unwrap_or(cmd_format)
    }
}

/// Resolve the data directory from flag/env, config, then platform default.
pub fn resolve_data_dir(data_dir: Option<PathBuf>, config: &Config) -> PathBuf {
    data_dir
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(lumen_store::default_data_dir)
}

/// Resolve the HTTP bridge URL from flag/env or config.
pub fn resolve_url(url: Option<String>, config: &Config) -> Result<String> {
    url.or_else(|| config.url.clone()).ok_or_else(|| {
        anyhow::anyhow!(
            "No HTTP bridge URL. Use --url <URL> or run 'lumen config set url <URL>'."
        )
    })
}
