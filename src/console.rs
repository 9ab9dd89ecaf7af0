// src/console.rs

//! Operator commands read from obsidia's own stdin.

use std::str::FromStr;

use crate::errors::{ObsidiaError, Result};
use crate::fleet::Fleet;

const USAGE: &str = "commands: status | start <srv> | stop <srv> | restart <srv> | kill <srv> | \
backup <srv> | backups <srv> | restore <srv> <id> | log <srv> | send <srv> <text> | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Status,
    Start(String),
    Stop(String),
    Restart(String),
    Kill(String),
    Backup(String),
    Backups(String),
    Restore { server: String, id: String },
    Log(String),
    Send { server: String, text: String },
    Help,
    Quit,
}

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOutcome {
    /// Lines to show the operator.
    Output(Vec<String>),
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = ObsidiaError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let server = |what: &str| -> Result<String> {
            let mut words = rest.split_whitespace();
            match (words.next(), words.next()) {
                (Some(name), None) => Ok(name.to_string()),
                _ => Err(ObsidiaError::CommandError(format!("usage: {what} <server>"))),
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "status" => Ok(Self::Status),
            "start" => Ok(Self::Start(server("start")?)),
            "stop" => Ok(Self::Stop(server("stop")?)),
            "restart" => Ok(Self::Restart(server("restart")?)),
            "kill" => Ok(Self::Kill(server("kill")?)),
            "backup" => Ok(Self::Backup(server("backup")?)),
            "backups" => Ok(Self::Backups(server("backups")?)),
            "log" => Ok(Self::Log(server("log")?)),
            "restore" => {
                let mut words = rest.split_whitespace();
                match (words.next(), words.next(), words.next()) {
                    (Some(server), Some(id), None) => Ok(Self::Restore {
                        server: server.to_string(),
                        id: id.to_string(),
                    }),
                    _ => Err(ObsidiaError::CommandError(
                        "usage: restore <server> <id>".to_string(),
                    )),
                }
            }
            "send" => match rest.split_once(char::is_whitespace) {
                Some((server, text)) if !text.trim().is_empty() => Ok(Self::Send {
                    server: server.to_string(),
                    text: text.trim().to_string(),
                }),
                _ => Err(ObsidiaError::CommandError(
                    "usage: send <server> <text>".to_string(),
                )),
            },
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err(ObsidiaError::CommandError("empty command".to_string())),
            other => Err(ObsidiaError::CommandError(format!(
                "unknown command '{other}'; {USAGE}"
            ))),
        }
    }
}

impl ConsoleCommand {
    /// Run the command against `fleet`.
    pub async fn execute(&self, fleet: &Fleet) -> Result<ConsoleOutcome> {
        let lines = match self {
            Self::Status => {
                let statuses = fleet.statuses();
                if statuses.is_empty() {
                    vec!["no servers".to_string()]
                } else {
                    statuses.iter().map(ToString::to_string).collect()
                }
            }
            Self::Start(name) => {
                fleet.get(name)?.start_server()?;
                vec![format!("{name}: starting")]
            }
            Self::Stop(name) => {
                fleet.get(name)?.stop_server().await?;
                vec![format!("{name}: stop requested")]
            }
            Self::Restart(name) => {
                fleet.get(name)?.restart_server().await?;
                vec![format!("{name}: restart requested")]
            }
            Self::Kill(name) => {
                if fleet.get(name)?.kill_server().await {
                    vec![format!("{name}: killed")]
                } else {
                    vec![format!("{name}: not running")]
                }
            }
            Self::Backup(name) => {
                let record = fleet.get(name)?.backup_now().await?;
                vec![format!("{name}: backup {} created", record.id)]
            }
            Self::Backups(name) => {
                let records = fleet.get(name)?.list_backups()?;
                if records.is_empty() {
                    vec![format!("{name}: no backups")]
                } else {
                    records.into_iter().map(|r| r.id).collect()
                }
            }
            Self::Restore { server, id } => {
                fleet.get(server)?.restore_backup(id).await?;
                vec![format!("{server}: restored backup {id}")]
            }
            Self::Log(name) => fleet.get(name)?.full_log()?,
            Self::Send { server, text } => {
                fleet.get(server)?.write(text).await?;
                Vec::new()
            }
            Self::Help => vec![USAGE.to_string()],
            Self::Quit => return Ok(ConsoleOutcome::Quit),
        };
        Ok(ConsoleOutcome::Output(lines))
    }
}
