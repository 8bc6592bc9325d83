//! Provisioning settings.

use std::path::PathBuf;
use std::time::Duration;

/// Default bound on each Terraform phase.
pub const DEFAULT_PHASE_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Directory holding the Terraform configuration.
    pub working_dir: PathBuf,
    /// Terraform executable; resolved through `PATH` when not absolute.
    pub binary: PathBuf,
    /// Upper bound on each phase.
    pub phase_timeout: Duration,
}

impl ProvisionConfig {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            binary: PathBuf::from("terraform"),
            phase_timeout: DEFAULT_PHASE_TIMEOUT,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_phase_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = timeout;
        self
    }
}
