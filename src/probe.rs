//! Startup readiness probing and best-effort backend launch.
//!
//! Readiness is advisory: the probe outcome only drives a startup warning,
//! and the gateway serves either way. The launcher is fire-and-forget with
//! no success signal — the probe is the only observable contract.

use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::upstream::ChatBackend;

/// Best-effort backend starter.
pub trait BackendLauncher: Send + Sync {
    /// Try to start the backend. Failures are logged, never raised.
    fn attempt_start(&self);
}

/// Launches the backend executable as a detached OS process.
pub struct CommandLauncher {
    program: String,
    args: Vec<String>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(str::to_string).collect(),
        }
    }

    /// Launcher for a locally installed `ollama serve`.
    pub fn ollama() -> Self {
        Self::new("ollama", ["serve"])
    }
}

impl BackendLauncher for CommandLauncher {
    fn attempt_start(&self) {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(child) => info!(program = %self.program, pid = child.id(), "backend launch attempted"),
            Err(e) => warn!(program = %self.program, "could not start backend: {e}"),
        }
    }
}

/// Poll the backend until it answers, up to `max_attempts`.
///
/// Returns as soon as one check succeeds, sleeping `interval` between
/// attempts. `false` on exhaustion — not an error, the caller logs a
/// warning and keeps serving.
pub async fn wait_until_ready(
    backend: &dyn ChatBackend,
    max_attempts: u32,
    interval: Duration,
) -> bool {
    for attempt in 1..=max_attempts {
        if backend.is_ready().await {
            info!(attempt, "Ollama backend is ready");
            return true;
        }
        debug!(attempt, max_attempts, "backend not ready yet");
        sleep(interval).await;
    }
    false
}
