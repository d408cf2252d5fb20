//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use lumen_types::{Rgb, ServiceEndpoint};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Visual styling mode for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum StyleMode {
    /// Colours and rounded tables (default)
    #[default]
    Rich,
    /// Plain text with no decorations (for scripting)
    Plain,
}

/// Reusable scan arguments
#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Scan duration in seconds
    #[arg(short = 'T', long, default_value = "5")]
    pub timeout: u64,

    /// Only keep devices whose name or identifier contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Hide devices that advertise no name
    #[arg(long)]
    pub named: bool,
}

#[derive(Parser)]
#[command(name = "lumen")]
#[command(author, version, about = "CLI for BLE LED controllers", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output (any non-empty NO_COLOR counts)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Visual styling mode (rich, plain)
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "rich",
        env = "LUMEN_STYLE"
    )]
    pub style: StyleMode,

    /// Directory holding the device bindings
    #[arg(long, global = true, env = "LUMEN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan for nearby BLE devices
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Omit header row in CSV output (useful for appending)
        #[arg(long)]
        no_header: bool,
    },

    /// Bind a device's turn-off and set-colour characteristics
    Setup {
        #[command(flatten)]
        scan: ScanArgs,

        /// Device identifier (prompted for when omitted)
        #[arg(short, long)]
        device: Option<String>,

        /// Turn-off characteristic as SERVICE/CHARACTERISTIC
        #[arg(long, value_name = "SERVICE/CHAR")]
        off: Option<ServiceEndpoint>,

        /// Set-colour characteristic as SERVICE/CHARACTERISTIC
        #[arg(long, value_name = "SERVICE/CHAR")]
        color: Option<ServiceEndpoint>,
    },

    /// List bound devices
    Devices {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Make a bound device the current one
    Use {
        /// Device identifier
        device: String,
    },

    /// Remove a device binding
    #[command(alias = "rm")]
    Remove {
        /// Device identifier
        device: String,
    },

    /// Set the colour of the current (or given) device
    Color {
        /// Colour as #rrggbb, #rgb, rgb(r, g, b) or r,g,b
        color: Rgb,

        /// Bound device to use instead of the current one
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Turn off the current (or given) device
    Off {
        /// Bound device to use instead of the current one
        #[arg(short, long)]
        device: Option<String>,
    },

    /// Drive a light through its HTTP bridge
    Http {
        /// Bridge base URL (overrides config)
        #[arg(long, env = "LUMEN_HTTP_URL")]
        url: Option<String>,

        #[command(subcommand)]
        action: HttpAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// HTTP bridge subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum HttpAction {
    /// Set the colour
    Color {
        /// Colour as #rrggbb, #rgb, rgb(r, g, b) or r,g,b
        color: Rgb,
    },

    /// Turn the light off
    Off,
}

/// Configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Default scan duration in seconds
    Timeout,
    /// HTTP bridge base URL
    Url,
    /// Default output format
    Format,
    /// Disable colored output
    NoColor,
    /// Directory holding the device bindings
    DataDir,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
        /// Configuration value
        value: String,
    },

    /// Unset (remove) a configuration value
    Unset {
        /// Configuration key to remove
        #[arg(value_enum)]
        key: ConfigKey,
    },
}
