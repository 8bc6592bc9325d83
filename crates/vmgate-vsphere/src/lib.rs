//! vmgate-vsphere — control-plane client for VM hardware reconfiguration.
//!
//! Talks to the vSphere REST API on behalf of the gateway. Two operations
//! are exposed, each behind a trait so the gateway can orchestrate them
//! without knowing about HTTP:
//!
//! ```text
//! VsphereClient
//!   ├── SessionProvider::acquire_session()
//!   │     POST /rest/com/vmware/cis/session  (basic auth) → SessionToken
//!   └── HardwareExecutor::apply()
//!         PATCH /rest/vcenter/vm/{vm}/hardware/{kind}
//!         (vmware-api-session-id header) → HardwareUpdateResult
//! ```
//!
//! Tokens are never cached: every call to `acquire_session` performs one
//! round-trip, and every request builds its own HTTP client. Nothing is
//! retried.
//!
//! TLS certificate verification is on unless the configuration opts out
//! with `insecure_skip_verify`, which is logged at `warn` when the client
//! is built.

pub mod client;
pub mod config;
pub mod error;
pub mod hardware;
pub mod session;
pub mod types;

pub use client::VsphereClient;
pub use config::VsphereConfig;
pub use error::{VsphereError, VsphereResult};
pub use hardware::HardwareExecutor;
pub use session::SessionProvider;
pub use types::*;
