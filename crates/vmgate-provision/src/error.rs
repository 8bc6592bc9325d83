//! Provisioning error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::trigger::Phase;

pub type ProvisionResult<T> = Result<T, ProvisionError>;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The phase ran and exited non-zero. `stderr` is passed to the caller.
    #[error("Terraform {phase} failed")]
    PhaseFailed {
        phase: Phase,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Terraform {phase} timed out after {}s", .after.as_secs())]
    TimedOut { phase: Phase, after: Duration },

    #[error("failed to start Terraform {phase}: {source}")]
    Spawn {
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    #[error("working directory {} does not exist", .0.display())]
    WorkingDirMissing(PathBuf),
}
