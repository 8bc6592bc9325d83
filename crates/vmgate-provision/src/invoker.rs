//! Child-process execution.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ProvisionError, ProvisionResult};
use crate::trigger::Phase;

/// One process to run for a provisioning phase.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub phase: Phase,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a process to completion and captures its output.
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    async fn invoke(&self, invocation: &Invocation) -> ProvisionResult<ProcessOutput>;
}

/// [`ProcessInvoker`] backed by `tokio::process`.
///
/// The child is spawned with `kill_on_drop`, so abandoning it on timeout
/// (or when the HTTP request is cancelled) terminates it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioInvoker;

#[async_trait]
impl ProcessInvoker for TokioInvoker {
    async fn invoke(&self, invocation: &Invocation) -> ProvisionResult<ProcessOutput> {
        let phase = invocation.phase;
        debug!(
            %phase,
            program = %invocation.program.display(),
            dir = %invocation.working_dir.display(),
            "spawning provisioning phase"
        );

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProvisionError::Spawn { phase, source })?;

        let waited = tokio::time::timeout(invocation.timeout, child.wait_with_output()).await;
        let output = match waited {
            Ok(result) => result.map_err(|source| ProvisionError::Spawn { phase, source })?,
            Err(_) => {
                warn!(
                    target_system = "terraform",
                    %phase,
                    timeout_secs = invocation.timeout.as_secs(),
                    "provisioning phase timed out, child killed"
                );
                return Err(ProvisionError::TimedOut {
                    phase,
                    after: invocation.timeout,
                });
            }
        };

        Ok(ProcessOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
