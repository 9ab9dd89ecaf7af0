// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `obsidia`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "obsidia",
    version,
    about = "Supervise long-running game servers: restarts, schedules and backups.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the site config file (TOML).
    ///
    /// Default: `obsidia.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "obsidia.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OBSIDIA_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Do not start any server at launch, regardless of
    /// `start_all_on_startup`.
    #[arg(long)]
    pub no_start: bool,

    /// Load and validate every config, print the discovered servers and
    /// their launch commands, then exit.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
