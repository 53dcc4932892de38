use clap::{Args, Subcommand, ValueEnum};

use wires::model::BackupKind;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Open the terminal dashboard (the default when no command is given)
    Dashboard,

    /// Fetch history, backup listings and system documents once
    Snapshot {
        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Print live samples as they arrive
    Watch {
        /// Stop after this many samples
        #[arg(long)]
        count: Option<usize>,
        /// Emit one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Edit the device blacklist
    Blacklist {
        #[command(subcommand)]
        command: ListCommands,
    },

    /// Edit the device whitelist
    Whitelist {
        #[command(subcommand)]
        command: ListCommands,
    },

    /// Manage backups on the device
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Reboot the device
    Reboot(ConfirmArgs),

    /// Power the device off
    Shutdown(ConfirmArgs),

    /// Delete all captured data on the device
    ClearData(ConfirmArgs),

    /// Show or change the saved configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum ListCommands {
    /// Add an IPv4 address
    Add { ip: String },
    /// Remove an IPv4 address
    Remove { ip: String },
}

#[derive(Subcommand)]
pub(crate) enum BackupCommands {
    /// Ask the device to write a new backup file
    Save {
        #[arg(value_enum)]
        kind: BackupKindArg,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConfigCommands {
    /// Show the effective configuration
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Persist settings to the config file
    Set {
        /// REST backend base URL
        #[arg(long)]
        url: Option<String>,
        /// Live feed base URL
        #[arg(long)]
        feed_url: Option<String>,
        /// Samples kept per chart
        #[arg(long)]
        capacity: Option<usize>,
        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Args)]
pub(crate) struct ConfirmArgs {
    /// Required: the command takes effect immediately and cannot be undone
    #[arg(long)]
    pub(crate) yes: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub(crate) enum BackupKindArg {
    Packet,
    Anomaly,
}

impl From<BackupKindArg> for BackupKind {
    fn from(arg: BackupKindArg) -> Self {
        match arg {
            BackupKindArg::Packet => BackupKind::Packet,
            BackupKindArg::Anomaly => BackupKind::Anomaly,
        }
    }
}
