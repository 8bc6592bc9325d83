//! Two-phase provisioning run.

use std::ffi::OsString;
use std::fmt;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::ProvisionConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::invoker::{Invocation, ProcessInvoker, TokioInvoker};

/// Provisioning phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Apply,
}

impl Phase {
    fn args(self) -> &'static [&'static str] {
        match self {
            Self::Init => &["init"],
            Self::Apply => &["apply", "-auto-approve"],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("init"),
            Self::Apply => f.write_str("apply"),
        }
    }
}

/// Successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningOutcome {
    /// Standard output of the apply phase.
    pub output: String,
}

/// Runs `init` then `apply` in the configured directory.
pub struct ProvisioningTrigger {
    config: ProvisionConfig,
    invoker: Arc<dyn ProcessInvoker>,
}

impl ProvisioningTrigger {
    pub fn new(config: ProvisionConfig) -> Self {
        Self::with_invoker(config, Arc::new(TokioInvoker))
    }

    pub fn with_invoker(config: ProvisionConfig, invoker: Arc<dyn ProcessInvoker>) -> Self {
        Self { config, invoker }
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    pub async fn provision(&self) -> ProvisionResult<ProvisioningOutcome> {
        if !self.config.working_dir.is_dir() {
            let err = ProvisionError::WorkingDirMissing(self.config.working_dir.clone());
            error!(target_system = "terraform", error = %err, "provisioning aborted");
            return Err(err);
        }

        info!(
            target_system = "terraform",
            dir = %self.config.working_dir.display(),
            "provisioning started"
        );

        self.run_phase(Phase::Init).await?;
        let stdout = self.run_phase(Phase::Apply).await?;

        info!(target_system = "terraform", "provisioning finished");
        Ok(ProvisioningOutcome { output: stdout })
    }

    /// Run one phase; returns its stdout on a zero exit.
    async fn run_phase(&self, phase: Phase) -> ProvisionResult<String> {
        let invocation = Invocation {
            phase,
            program: self.config.binary.clone(),
            args: phase.args().iter().map(OsString::from).collect(),
            working_dir: self.config.working_dir.clone(),
            timeout: self.config.phase_timeout,
        };

        let output = self.invoker.invoke(&invocation).await.inspect_err(|e| {
            error!(
                target_system = "terraform",
                operation = %phase,
                error = %e,
                "phase did not complete"
            );
        })?;

        if !output.success {
            error!(
                target_system = "terraform",
                operation = %phase,
                exit_code = ?output.exit_code,
                "phase exited with failure"
            );
            return Err(ProvisionError::PhaseFailed {
                phase,
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }
}
