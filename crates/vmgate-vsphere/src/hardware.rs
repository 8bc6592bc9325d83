//! Hardware update execution.
//!
//! Issues a single PATCH per call and classifies the response:
//! empty 2xx → synthesized marker, JSON 2xx → passed through,
//! non-2xx → `UpstreamRejected` with the upstream status and body.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::client::{SESSION_HEADER, VsphereClient};
use crate::error::{VsphereError, VsphereResult};
use crate::types::{HardwareChange, HardwareKind, HardwareUpdateResult, SessionToken, VmId};

const OPERATION: &str = "update_hardware";

/// Applies a hardware change to one VM using a caller-supplied token.
#[async_trait]
pub trait HardwareExecutor: Send + Sync {
    /// Send the change once. Retrying is the caller's decision.
    async fn apply(
        &self,
        vm_id: &VmId,
        change: &HardwareChange,
        token: &SessionToken,
    ) -> VsphereResult<HardwareUpdateResult>;
}

/// Path of the hardware resource for `vm_id` and `kind`.
pub fn hardware_path(vm_id: &VmId, kind: HardwareKind) -> String {
    format!(
        "/rest/vcenter/vm/{}/hardware/{}",
        urlencoding::encode(vm_id.as_str()),
        kind.path_segment()
    )
}

#[async_trait]
impl HardwareExecutor for VsphereClient {
    async fn apply(
        &self,
        vm_id: &VmId,
        change: &HardwareChange,
        token: &SessionToken,
    ) -> VsphereResult<HardwareUpdateResult> {
        let kind = change.kind();
        let url = self.config().endpoint(&hardware_path(vm_id, kind));
        let http = self.http(OPERATION)?;

        let result = async {
            let response = http
                .patch(&url)
                .header(SESSION_HEADER, token.as_str())
                .json(&change.request_body())
                .send()
                .await
                .map_err(|e| VsphereError::from_reqwest(OPERATION, e))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| VsphereError::from_reqwest(OPERATION, e))?;

            if !status.is_success() {
                return Err(VsphereError::rejected(OPERATION, status, &body));
            }
            interpret_success_body(kind, &body)
        }
        .await;

        match &result {
            Ok(_) => debug!(
                target_system = "vsphere",
                operation = OPERATION,
                vm_id = %vm_id,
                %kind,
                "hardware updated"
            ),
            Err(e) => error!(
                target_system = "vsphere",
                operation = OPERATION,
                vm_id = %vm_id,
                %kind,
                error = %e,
                "hardware update failed"
            ),
        }
        result
    }
}

/// Map a 2xx body to a result. Whitespace-only counts as empty.
pub fn interpret_success_body(
    kind: HardwareKind,
    body: &[u8],
) -> VsphereResult<HardwareUpdateResult> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(HardwareUpdateResult::Synthesized { kind });
    }
    serde_json::from_slice::<Value>(body)
        .map(HardwareUpdateResult::Upstream)
        .map_err(|e| VsphereError::protocol(OPERATION, format!("2xx body is not JSON: {e}")))
}
