//! HTTP client for the vSphere REST API.

use std::sync::Arc;

use reqwest::Client;
use tracing::warn;

use crate::config::VsphereConfig;
use crate::error::{VsphereError, VsphereResult};

/// Session endpoint (basic auth → `{"value": token}`).
pub const SESSION_PATH: &str = "/rest/com/vmware/cis/session";

/// Header carrying the session token on authenticated calls.
pub const SESSION_HEADER: &str = "vmware-api-session-id";

/// Control-plane client implementing [`SessionProvider`](crate::SessionProvider)
/// and [`HardwareExecutor`](crate::HardwareExecutor).
///
/// Cheap to clone. Holds configuration only; every call builds its own
/// `reqwest::Client`, so no connection outlives the call that opened it.
#[derive(Debug, Clone)]
pub struct VsphereClient {
    config: Arc<VsphereConfig>,
}

impl VsphereClient {
    pub fn new(config: VsphereConfig) -> Self {
        if config.insecure_skip_verify {
            warn!(
                target_system = "vsphere",
                base_url = %config.base_url,
                "TLS certificate verification is DISABLED for the control plane"
            );
        }
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &VsphereConfig {
        &self.config
    }

    /// Build a one-shot HTTP client honoring the timeout and TLS settings.
    pub(crate) fn http(&self, operation: &'static str) -> VsphereResult<Client> {
        Client::builder()
            .timeout(self.config.timeout)
            .danger_accept_invalid_certs(self.config.insecure_skip_verify)
            .build()
            .map_err(|e| VsphereError::Internal {
                operation,
                message: format!("failed to build HTTP client: {e}"),
            })
    }
}
