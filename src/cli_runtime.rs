use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wires::config::{ConfigOverrides, WiresConfig, default_config_path};

use crate::Commands;

#[derive(Parser)]
#[command(name = "wires")]
#[command(about = "WIRES network monitoring dashboard", long_about = None)]
pub(crate) struct Cli {
    /// Config file (defaults to ./wires.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// REST backend base URL for this run
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Live feed base URL for this run
    #[arg(long, value_name = "URL")]
    feed_url: Option<String>,

    /// Samples kept per chart for this run
    #[arg(long, value_name = "N")]
    capacity: Option<usize>,

    /// Append logs to this file (the dashboard logs nowhere else)
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Everything a command handler needs from the global flags.
pub(crate) struct RunContext {
    pub(crate) config_path: PathBuf,
    pub(crate) config: WiresConfig,
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, None | Some(Commands::Dashboard));
    init_tracing(cli.log_file.as_deref(), interactive)?;

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = WiresConfig::load(&config_path)?;
    config.apply_overrides(&ConfigOverrides {
        base_url: cli.url.clone(),
        feed_url: cli.feed_url.clone(),
        window_capacity: cli.capacity,
    });
    let ctx = RunContext {
        config_path,
        config,
    };

    match cli.command {
        None | Some(Commands::Dashboard) => wires::tui::run(&ctx.config)?,
        Some(command) => crate::cli_exec::handle_command(&ctx, command)?,
    }

    Ok(())
}

/// Line-oriented commands log to stderr. The dashboard owns the terminal, so it
/// only logs when a file was given.
fn init_tracing(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env("WIRES_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None if interactive => {}
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
