//! Executes a [`CommandPlan`].
//!
//! Setup steps run one after another and must each exit successfully. The
//! last step is the port-forward: it is left running until the shutdown token
//! is cancelled, then asked to stop with SIGTERM and killed if it is still
//! alive after the grace period. `run_plan` only returns once that child has
//! been reaped.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Error, Result, StepError};
use crate::plan::{CommandPlan, PlannedCommand};

pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// How long a failed port-forward waits for a pending shutdown before it counts as a failure.
const SHUTDOWN_SETTLE: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct RunOptions {
    pub shutdown_grace: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

pub async fn run_plan(
    plan: &CommandPlan,
    shutdown: &CancellationToken,
    options: &RunOptions,
) -> Result<()> {
    let Some(forward) = plan.forward_step() else {
        return Ok(());
    };

    for (index, step) in plan.setup_steps().iter().enumerate() {
        info!(step = index, command = %step, "{}", step.label);
        run_to_completion(index, step, shutdown).await?;
    }

    let index = plan.setup_steps().len();
    info!(step = index, command = %forward, "{}...", forward.label);
    forward_until_shutdown(index, forward, shutdown, options).await
}

async fn run_to_completion(
    index: usize,
    step: &PlannedCommand,
    shutdown: &CancellationToken,
) -> Result<()> {
    let mut child = spawn(index, step)?;
    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|err| failure(index, step, StepError::Wait(err)))?;
            check_status(index, step, status)
        }
        _ = shutdown.cancelled() => {
            if let Err(err) = child.kill().await {
                warn!(step = index, error = %err, "failed to kill interrupted command");
            }
            Err(Error::Interrupted {
                index,
                command: step.to_string(),
            })
        }
    }
}

async fn forward_until_shutdown(
    index: usize,
    step: &PlannedCommand,
    shutdown: &CancellationToken,
    options: &RunOptions,
) -> Result<()> {
    let mut child = spawn(index, step)?;
    tokio::select! {
        status = child.wait() => {
            let status = status.map_err(|err| failure(index, step, StepError::Wait(err)))?;
            if !status.success() && shutdown_follows(shutdown).await {
                info!(step = index, %status, "port-forward stopped by shutdown signal");
                return Ok(());
            }
            check_status(index, step, status)?;
            info!(step = index, "port-forward exited; waiting for shutdown signal");
            shutdown.cancelled().await;
            Ok(())
        }
        _ = shutdown.cancelled() => {
            info!(step = index, "stopping port-forward");
            let status = terminate(&mut child, options.shutdown_grace)
                .await
                .map_err(|err| failure(index, step, StepError::Wait(err)))?;
            match status {
                Some(status) => info!(step = index, %status, "port-forward stopped"),
                None => warn!(step = index, "port-forward killed after grace period"),
            }
            Ok(())
        }
    }
}

// Ctrl+C reaches the whole process group, so the child can die from it before
// the signal task has cancelled the token.
async fn shutdown_follows(shutdown: &CancellationToken) -> bool {
    tokio::time::timeout(SHUTDOWN_SETTLE, shutdown.cancelled())
        .await
        .is_ok()
}

fn spawn(index: usize, step: &PlannedCommand) -> Result<Child> {
    Command::new(&step.program)
        .args(&step.args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| failure(index, step, StepError::Spawn(err)))
}

fn check_status(index: usize, step: &PlannedCommand, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(failure(index, step, StepError::Exit(status)))
    }
}

fn failure(index: usize, step: &PlannedCommand, source: StepError) -> Error {
    Error::SubprocessFailure {
        index,
        command: step.to_string(),
        source,
    }
}

/// Returns `None` when the child had to be killed.
async fn terminate(child: &mut Child, grace: Duration) -> std::io::Result<Option<ExitStatus>> {
    request_stop(child);
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status.map(Some),
        Err(_) => {
            child.kill().await?;
            Ok(None)
        }
    }
}

#[cfg(unix)]
fn request_stop(child: &Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: the pid belongs to our child, which has not been reaped yet.
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        warn!(pid, error = %std::io::Error::last_os_error(), "failed to send SIGTERM");
    }
}

#[cfg(not(unix))]
fn request_stop(_child: &Child) {}
