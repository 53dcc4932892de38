use std::sync::Arc;
use std::sync::mpsc;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use wires::access::AccessListController;
use wires::api::ApiClient;
use wires::config::WiresConfig;
use wires::control::{ControlAck, DeviceCommand, DeviceControlProxy};
use wires::error::FetchError;
use wires::feed::{LiveFeedSubscriber, SseTransport};
use wires::model::{AccessList, Channel, Sample};
use wires::snapshot::SnapshotLoader;

use crate::cli_commands::ConfirmArgs;
use crate::cli_runtime::RunContext;
use crate::{BackupCommands, Commands, ConfigCommands, ListCommands};

pub(crate) fn handle_command(ctx: &RunContext, command: Commands) -> Result<()> {
    match command {
        Commands::Dashboard => wires::tui::run(&ctx.config),
        Commands::Snapshot { json } => handle_snapshot(&ctx.config, json),
        Commands::Watch { count, json } => handle_watch(&ctx.config, count, json),
        Commands::Blacklist { command } => handle_list(&ctx.config, AccessList::Blacklist, command),
        Commands::Whitelist { command } => handle_list(&ctx.config, AccessList::Whitelist, command),
        Commands::Backup {
            command: BackupCommands::Save { kind },
        } => handle_device(&ctx.config, DeviceCommand::SaveBackup(kind.into())),
        Commands::Reboot(args) => {
            require_yes(&args, "reboot")?;
            handle_device(&ctx.config, DeviceCommand::Reboot)
        }
        Commands::Shutdown(args) => {
            require_yes(&args, "shutdown")?;
            handle_device(&ctx.config, DeviceCommand::Shutdown)
        }
        Commands::ClearData(args) => {
            require_yes(&args, "clear-data")?;
            handle_device(&ctx.config, DeviceCommand::ClearData)
        }
        Commands::Config { command } => handle_config(ctx, command),
    }
}

fn api_client(config: &WiresConfig) -> Result<ApiClient> {
    ApiClient::new(&config.base_url, config.request_timeout())
        .with_context(|| format!("create client for {}", config.base_url))
}

fn require_yes(args: &ConfirmArgs, name: &str) -> Result<()> {
    if !args.yes {
        anyhow::bail!("`wires {}` takes effect immediately; pass --yes to confirm", name);
    }
    Ok(())
}

fn handle_snapshot(config: &WiresConfig, json: bool) -> Result<()> {
    let loader = SnapshotLoader::new(api_client(config)?);
    let snapshot = loader
        .load()
        .with_context(|| format!("load snapshot from {}", config.base_url))?;

    if json {
        let doc = json!({
            "packet_backups": part_json(&snapshot.packet_backups)?,
            "anomaly_backups": part_json(&snapshot.anomaly_backups)?,
            "packets": part_json(&snapshot.packet_samples)?,
            "anomalies": part_json(&snapshot.anomaly_samples)?,
            "system_info": part_json(&snapshot.system_info)?,
            "system_summary": part_json(&snapshot.system_summary)?,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&doc).context("serialize snapshot json")?
        );
        return Ok(());
    }

    print_samples("packets", &snapshot.packet_samples);
    print_samples("anomalies", &snapshot.anomaly_samples);
    print_files("packet backups", &snapshot.packet_backups);
    print_files("anomaly backups", &snapshot.anomaly_backups);
    print_document("system info", &snapshot.system_info)?;
    print_document("system summary", &snapshot.system_summary)?;
    Ok(())
}

fn part_json<T: serde::Serialize>(part: &Result<T, FetchError>) -> Result<Value> {
    match part {
        Ok(v) => serde_json::to_value(v).context("serialize snapshot part"),
        Err(err) => Ok(json!({ "error": err.to_string() })),
    }
}

fn print_samples(label: &str, part: &Result<Vec<Sample>, FetchError>) {
    match part {
        Ok(samples) => {
            println!("{}: {} samples", label, samples.len());
            for s in samples {
                println!("  {} {}", s.timestamp, s.value);
            }
        }
        Err(err) => println!("{}: unavailable ({})", label, err),
    }
}

fn print_files(label: &str, part: &Result<Vec<String>, FetchError>) {
    match part {
        Ok(files) if files.is_empty() => println!("{}: none", label),
        Ok(files) => {
            println!("{}:", label);
            for f in files {
                println!("  {}", f);
            }
        }
        Err(err) => println!("{}: unavailable ({})", label, err),
    }
}

fn print_document(label: &str, part: &Result<Value, FetchError>) -> Result<()> {
    match part {
        Ok(doc) => println!(
            "{}: {}",
            label,
            serde_json::to_string_pretty(doc).context("serialize system document")?
        ),
        Err(err) => println!("{}: unavailable ({})", label, err),
    }
    Ok(())
}

fn handle_watch(config: &WiresConfig, count: Option<usize>, json: bool) -> Result<()> {
    let transport = SseTransport::new(&config.feed_url)
        .with_context(|| format!("create feed client for {}", config.feed_url))?;
    let mut subscriber = LiveFeedSubscriber::new(Arc::new(transport));

    let (tx, rx) = mpsc::channel::<(Channel, Sample)>();
    let conn = subscriber
        .subscribe(move |channel, sample| {
            let _ = tx.send((channel, sample));
        })
        .context("subscribe to live feed")?;

    let mut seen = 0usize;
    for (channel, sample) in rx.iter() {
        if json {
            let line = json!({
                "channel": channel.as_str(),
                "timestamp": sample.timestamp,
                "value": sample.value,
            });
            println!("{}", line);
        } else {
            println!("{} {} {}", channel, sample.timestamp, sample.value);
        }
        seen += 1;
        if count.is_some_and(|n| seen >= n) {
            break;
        }
    }

    subscriber.unsubscribe(conn);
    Ok(())
}

fn handle_list(config: &WiresConfig, list: AccessList, command: ListCommands) -> Result<()> {
    let access = AccessListController::new(api_client(config)?);
    match command {
        ListCommands::Add { ip } => {
            access
                .add(list, &ip)
                .with_context(|| format!("add {} to {}", ip, list))?;
            println!("Added {} to {}", ip.trim(), list);
        }
        ListCommands::Remove { ip } => {
            access
                .remove(list, &ip)
                .with_context(|| format!("remove {} from {}", ip, list))?;
            println!("Removed {} from {}", ip.trim(), list);
        }
    }
    Ok(())
}

fn handle_device(config: &WiresConfig, command: DeviceCommand) -> Result<()> {
    let control = DeviceControlProxy::new(api_client(config)?);
    let ack = control.send(command).context("device command failed")?;
    println!("{}", describe_ack(command, &ack));
    Ok(())
}

fn describe_ack(command: DeviceCommand, ack: &ControlAck) -> String {
    let mut line = format!("{} accepted", command.describe());
    if let Some(file) = &ack.backup_file {
        line.push_str(&format!(" ({})", file));
    } else if let Some(msg) = &ack.message {
        line.push_str(&format!(": {}", msg));
    }
    line
}

fn handle_config(ctx: &RunContext, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show { json } => {
            let cfg = &ctx.config;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(cfg).context("serialize config json")?
                );
            } else {
                println!("config: {}", ctx.config_path.display());
                println!("url: {}", cfg.base_url);
                println!("feed_url: {}", cfg.feed_url);
                println!("capacity: {}", cfg.window_capacity);
                println!("timeout_ms: {}", cfg.request_timeout_ms);
                println!("blacklist: {}", cfg.blacklist.join(", "));
                println!("whitelist: {}", cfg.whitelist.join(", "));
            }
        }
        ConfigCommands::Set {
            url,
            feed_url,
            capacity,
            timeout_ms,
        } => {
            // Start from the file, not from this run's overrides.
            let mut cfg = WiresConfig::load(&ctx.config_path)?;
            if let Some(url) = url {
                cfg.base_url = url;
            }
            if let Some(url) = feed_url {
                cfg.feed_url = url;
            }
            if let Some(capacity) = capacity {
                if capacity == 0 {
                    anyhow::bail!("--capacity must be at least 1");
                }
                cfg.window_capacity = capacity;
            }
            if let Some(ms) = timeout_ms {
                cfg.request_timeout_ms = ms;
            }
            cfg.save(&ctx.config_path)?;
            println!("Saved {}", ctx.config_path.display());
        }
    }
    Ok(())
}
