//! vmgate-api — REST API for the VM operations gateway.
//!
//! Provides axum route handlers that reconfigure VM hardware through the
//! vSphere control plane, read VM usage series from InfluxDB, and trigger
//! Terraform provisioning.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | PATCH | `/vsphere/vm/{vm_id}/memory` | Set VM memory size |
//! | PATCH | `/vsphere/vm/{vm_id}/cpu` | Set VM CPU topology |
//! | POST | `/createvm` | Run `terraform init` + `apply` |
//! | POST | `/vsphere/memory` | Memory usage series for a VM |
//! | POST | `/vsphere/cpu` | CPU usage series for a VM |
//! | GET | `/healthz` | Liveness |

pub mod error;
pub mod handlers;
pub mod reconfigure;
pub mod telemetry_handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;

use vmgate_provision::ProvisioningTrigger;
use vmgate_telemetry::TelemetryStore;
use vmgate_vsphere::VsphereClient;

pub use error::{ApiError, ErrorBody};
pub use reconfigure::Reconfigurer;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub reconfigurer: Reconfigurer,
    pub telemetry: Arc<TelemetryStore>,
    pub provisioner: Arc<ProvisioningTrigger>,
}

impl ApiState {
    /// Wire the production collaborators: one vSphere client serves as both
    /// session provider and hardware executor.
    pub fn new(
        vsphere: VsphereClient,
        telemetry: Arc<TelemetryStore>,
        provisioner: Arc<ProvisioningTrigger>,
    ) -> Self {
        let vsphere = Arc::new(vsphere);
        Self {
            reconfigurer: Reconfigurer::new(vsphere.clone(), vsphere),
            telemetry,
            provisioner,
        }
    }
}

/// Build the complete gateway router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/vsphere/vm/{vm_id}/memory", patch(handlers::update_memory))
        .route("/vsphere/vm/{vm_id}/cpu", patch(handlers::update_cpu))
        .route("/createvm", post(handlers::create_vm))
        .route("/vsphere/memory", post(telemetry_handlers::memory_usage))
        .route("/vsphere/cpu", post(telemetry_handlers::cpu_usage))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
