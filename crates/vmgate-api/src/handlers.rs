//! Reconfiguration, provisioning and health handlers.
//!
//! Malformed JSON bodies are turned into the gateway's own validation
//! error so every failure shares one body shape.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde_json::json;

use crate::ApiState;
use crate::error::ApiError;
use crate::reconfigure::{CpuUpdateRequest, HardwareRequest, MemoryUpdateRequest};

// ── Hardware ───────────────────────────────────────────────────────

/// PATCH /vsphere/vm/{vm_id}/memory
pub async fn update_memory(
    State(state): State<ApiState>,
    Path(vm_id): Path<String>,
    body: Result<Json<MemoryUpdateRequest>, JsonRejection>,
) -> impl IntoResponse {
    match body {
        Ok(Json(req)) => reconfigure(&state, &vm_id, req.into()).await,
        Err(rejection) => ApiError::Validation(rejection.body_text()).into_response(),
    }
}

/// PATCH /vsphere/vm/{vm_id}/cpu
pub async fn update_cpu(
    State(state): State<ApiState>,
    Path(vm_id): Path<String>,
    body: Result<Json<CpuUpdateRequest>, JsonRejection>,
) -> impl IntoResponse {
    match body {
        Ok(Json(req)) => reconfigure(&state, &vm_id, req.into()).await,
        Err(rejection) => ApiError::Validation(rejection.body_text()).into_response(),
    }
}

async fn reconfigure(
    state: &ApiState,
    vm_id: &str,
    request: HardwareRequest,
) -> axum::response::Response {
    match state.reconfigurer.reconfigure(vm_id, request).await {
        Ok(response) => Json(response).into_response(),
        Err(failure) => ApiError::from(failure).into_response(),
    }
}

// ── Provisioning ───────────────────────────────────────────────────

/// POST /createvm
pub async fn create_vm(State(state): State<ApiState>) -> impl IntoResponse {
    match state.provisioner.provision().await {
        Ok(outcome) => Json(json!({
            "message": "VM creation triggered",
            "output": outcome.output,
        }))
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

// ── Health ─────────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}
