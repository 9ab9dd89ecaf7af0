// src/process/mod.rs

//! Process layer: spawning a managed server with `tokio::process::Command`
//! and talking to its console.
//!
//! - [`launch`] builds the `<executable> <args> -jar <jar> <flag>` command.
//! - [`handle`] owns the OS child: stdin writes, cooperative stop, kill,
//!   liveness/readiness queries.
//! - [`reader`] contains the background stdout reader (readiness detection +
//!   log fan-out) and the stderr drain.

pub mod handle;
pub mod launch;
pub mod reader;

pub use handle::{ExitRecord, ProcessHandle};
pub use launch::LaunchSpec;
