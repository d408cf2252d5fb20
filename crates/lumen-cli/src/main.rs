use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod format;
mod style;
mod util;

use cli::{Cli, Commands, ScanArgs};
use commands::SetupArgs;
use config::{Config, DEFAULT_SCAN_TIMEOUT, resolve_data_dir, resolve_format, resolve_timeout};
use format::FormatOptions;
use lumen_core::ScanOptions;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "lumen", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    // Logs go to stderr so JSON and CSV output stay clean
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load();
    let no_color = cli.no_color || config.no_color;

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::format_error(&format!("{:#}", e), no_color));
            if let Some(kind) = util::failure_kind(&e) {
                eprintln!("{}", style::format_info(kind.user_message(), no_color));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &Config) -> Result<()> {
    let no_color = cli.no_color || config.no_color;
    let opts = FormatOptions::new(no_color, cli.style).with_compact(cli.compact);
    let data_dir = resolve_data_dir(cli.data_dir, config);
    let output = cli.output.as_ref();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Scan {
            scan,
            format,
            no_header,
        } => {
            let format = resolve_format(format, config);
            let opts = opts.with_no_header(no_header);
            commands::cmd_scan(&scan_options(&scan, config), format, output, quiet, &opts).await
        }
        Commands::Setup {
            scan,
            device,
            off,
            color,
        } => {
            let args = SetupArgs {
                device,
                turn_off: off,
                set_color: color,
            };
            commands::cmd_setup(&data_dir, &scan_options(&scan, config), args, quiet, &opts).await
        }
        Commands::Devices { format } => {
            let format = resolve_format(format, config);
            commands::cmd_devices(&data_dir, format, output, &opts)
        }
        Commands::Use { device } => commands::cmd_use(&data_dir, &device, quiet, no_color),
        Commands::Remove { device } => commands::cmd_remove(&data_dir, &device, quiet, no_color),
        Commands::Color { color, device } => {
            commands::cmd_color(&data_dir, color, device.as_deref(), quiet, no_color).await
        }
        Commands::Off { device } => {
            commands::cmd_off(&data_dir, device.as_deref(), quiet, no_color).await
        }
        Commands::Http { url, action } => {
            let url = config::resolve_url(url, config)?;
            commands::cmd_http(&url, action, quiet, no_color).await
        }
        Commands::Config { action } => commands::cmd_config(action, no_color),
        // Handled before logging starts
        Commands::Completions { .. } => Ok(()),
    }
}

fn scan_options(args: &ScanArgs, config: &Config) -> ScanOptions {
    let mut options = ScanOptions::new()
        .duration_secs(resolve_timeout(args.timeout, config, DEFAULT_SCAN_TIMEOUT))
        .named_only(args.named);
    if let Some(filter) = &args.filter {
        options = options.name_filter(filter.clone());
    }
    options
}
