// src/lib.rs

pub mod backup;
pub mod cli;
pub mod clock;
pub mod config;
pub mod console;
pub mod errors;
pub mod fleet;
pub mod fs;
pub mod logging;
pub mod logs;
pub mod process;
pub mod schedule;
pub mod supervisor;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::clock::{Clock, SystemClock};
use crate::config::load_site_config;
use crate::console::{ConsoleCommand, ConsoleOutcome};
use crate::fleet::Fleet;
use crate::fs::{FileSystem, RealFileSystem};
use crate::logs::TracingListener;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - site config loading and server discovery
/// - one supervisor per server, with console lines routed to `tracing`
/// - the operator console on stdin
/// - Ctrl-C handling and bounded shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let site = load_site_config(&config_path)?;
    let servers_dir = resolve_servers_dir(&config_path, &site.servers.directory);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fleet = Fleet::load(&servers_dir, fs, clock)?;
    info!(dir = ?servers_dir, servers = fleet.len(), "servers loaded");

    if args.dry_run {
        print_dry_run(&fleet);
        return Ok(());
    }

    fleet.subscribe_all(Arc::new(TracingListener));

    if site.servers.start_all_on_startup && !args.no_start {
        let started = fleet.start_all();
        info!(started, total = fleet.len(), "servers started");
    }

    run_console(&fleet).await;

    info!("shutting down");
    fleet.shutdown_all(site.servers.shutdown_timeout()).await;
    Ok(())
}

/// Read operator commands from stdin until `quit` or Ctrl-C.
///
/// A closed stdin (running as a service) leaves only Ctrl-C.
async fn run_console(fleet: &Fleet) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                return;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if handle_console_line(fleet, &line).await {
                        return;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed; waiting for Ctrl+C");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin; console disabled");
                    stdin_open = false;
                }
            },
        }
    }
}

/// Returns true when the operator asked to quit.
async fn handle_console_line(fleet: &Fleet, line: &str) -> bool {
    let command = match line.parse::<ConsoleCommand>() {
        Ok(c) => c,
        Err(e) => {
            println!("{e}");
            return false;
        }
    };

    match command.execute(fleet).await {
        Ok(ConsoleOutcome::Quit) => true,
        Ok(ConsoleOutcome::Output(lines)) => {
            for line in lines {
                println!("{line}");
            }
            false
        }
        Err(e) => {
            println!("error: {e}");
            false
        }
    }
}

/// A relative servers directory is resolved against the config file's
/// directory.
fn resolve_servers_dir(config_path: &Path, directory: &Path) -> PathBuf {
    if directory.is_absolute() {
        return directory.to_path_buf();
    }
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(directory),
        _ => directory.to_path_buf(),
    }
}

/// Print each server's resolved settings without spawning anything.
fn print_dry_run(fleet: &Fleet) {
    println!("obsidia dry-run");
    println!();
    println!("servers ({}):", fleet.len());
    for sup in fleet.iter() {
        let cfg = sup.config();
        println!("  - {}", sup.name());
        println!("      dir: {}", sup.directory().display());
        println!(
            "      cmd: {}",
            process::LaunchSpec::from_config(sup.directory(), &cfg.server).command_line()
        );
        match cfg.restarts.schedule {
            Some(rule) => println!("      restarts: {rule}"),
            None => println!("      restarts: off"),
        }
        println!("      restart_on_crash: {}", cfg.restarts.restart_on_crash);
        match cfg.backups.schedule {
            Some(rule) => println!(
                "      backups: {rule} (keep {})",
                cfg.backups.max_backups
            ),
            None => println!("      backups: off"),
        }
    }

    debug!("dry-run complete (no execution)");
}
