//! vmgate-provision — infrastructure provisioning through Terraform.
//!
//! A provisioning run is two child processes executed in the configured
//! working directory:
//!
//! ```text
//! provision()
//!   ├── Phase::Init   terraform init
//!   │     non-zero exit → PhaseFailed(Init), Apply never runs
//!   └── Phase::Apply  terraform apply -auto-approve
//!         non-zero exit → PhaseFailed(Apply)
//!         success       → ProvisioningOutcome { output: stdout }
//! ```
//!
//! Every phase is bounded by a timeout. A child that outlives it is killed
//! and the run fails with `TimedOut`. Processes are started through the
//! [`ProcessInvoker`] trait so the phase sequencing can be tested without
//! Terraform installed.

pub mod config;
pub mod error;
pub mod invoker;
pub mod trigger;

pub use config::ProvisionConfig;
pub use error::{ProvisionError, ProvisionResult};
pub use invoker::{Invocation, ProcessInvoker, ProcessOutput, TokioInvoker};
pub use trigger::{Phase, ProvisioningOutcome, ProvisioningTrigger};
