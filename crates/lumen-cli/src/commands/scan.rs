//! Scan command implementation.

use std::path::PathBuf;

use anyhow::Result;
use lumen_core::ScanOptions;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_scan_csv, format_scan_json, format_scan_text};
use crate::util::{open_transport, scan_devices, write_output};

pub async fn cmd_scan(
    options: &ScanOptions,
    format: OutputFormat,
    output: Option<&PathBuf>,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<()> {
    let transport = open_transport().await?;
    // Spinner only for text output
    let devices = scan_devices(&transport, options, quiet || format != OutputFormat::Text).await?;

    let content = match format {
        OutputFormat::Json => format_scan_json(&devices, opts)?,
        OutputFormat::Text => {
            let mut text = format_scan_text(&devices, opts);
            if !quiet && !devices.is_empty() {
                text.push_str("\nBind a device with: lumen setup --device <IDENTIFIER>\n");
            }
            text
        }
        OutputFormat::Csv => format_scan_csv(&devices, opts),
    };

    write_output(output, &content)
}
