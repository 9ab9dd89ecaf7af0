// src/supervisor/state.rs

//! Pure lifecycle state and the exit decision.
//!
//! Nothing here touches processes, channels or time; the async shell in
//! [`super::monitor`] feeds it the run flags at the moment a process exits
//! and applies the decision it gets back.

use std::fmt;

/// Lifecycle of one supervised server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SupervisorState {
    #[default]
    Stopped,
    Starting,
    Running,
    /// Explicit or scheduled restart in progress.
    Restarting,
    /// Unexpected exit; waiting out the restart delay before respawning.
    CrashRestarting,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Restarting => "restarting",
            Self::CrashRestarting => "crash-restarting",
        };
        f.write_str(s)
    }
}

/// Per-run flags consulted when the process exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunFlags {
    /// The operator wants the server up.
    pub should_run: bool,
    /// The shutdown command was sent on purpose; never crash-restart.
    pub explicit_stop: bool,
    /// A scheduled or operator restart asked the process to exit.
    pub restart_scheduled: bool,
}

impl RunFlags {
    /// Flags for a fresh run that should stay up.
    pub fn running() -> Self {
        Self {
            should_run: true,
            ..Self::default()
        }
    }

    /// Clear the per-run flags before a respawn.
    pub fn reset_for_respawn(&mut self) {
        self.explicit_stop = false;
        self.restart_scheduled = false;
    }
}

/// What to do after the process exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    Stop,
    Restart,
    CrashRestart,
}

impl ExitDecision {
    /// State entered while the decision is carried out.
    pub fn state(self) -> SupervisorState {
        match self {
            Self::Stop => SupervisorState::Stopped,
            Self::Restart => SupervisorState::Restarting,
            Self::CrashRestart => SupervisorState::CrashRestarting,
        }
    }
}

/// Decide on respawn, in order: explicit stop, then a requested restart,
/// then the crash policy.
pub fn decide_on_exit(flags: &RunFlags, restart_on_crash: bool) -> ExitDecision {
    if !flags.should_run || flags.explicit_stop {
        return ExitDecision::Stop;
    }
    if flags.restart_scheduled {
        return ExitDecision::Restart;
    }
    if restart_on_crash {
        return ExitDecision::CrashRestart;
    }
    ExitDecision::Stop
}
