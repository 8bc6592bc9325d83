//! Gateway error type and its HTTP mapping.
//!
//! Caller mistakes map to 400. Everything that went wrong past validation
//! maps to 500 with a body that says which system failed and, for
//! rejections, what the upstream said.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use vmgate_provision::ProvisionError;
use vmgate_telemetry::TelemetryError;
use vmgate_vsphere::VsphereError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Vsphere(#[from] VsphereError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_body: Option<Value>,
}

impl ErrorBody {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
            upstream_status: None,
            upstream_body: None,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Vsphere(VsphereError::Validation(_))
            | Self::Telemetry(TelemetryError::InvalidRange(_) | TelemetryError::MissingVmName) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Validation(msg) | Self::Vsphere(VsphereError::Validation(msg)) => {
                ErrorBody::new("Invalid request", msg.clone())
            }
            Self::Vsphere(e) => vsphere_body(e),
            Self::Telemetry(
                e @ (TelemetryError::InvalidRange(_) | TelemetryError::MissingVmName),
            ) => ErrorBody::new("Invalid request", e.to_string()),
            Self::Telemetry(TelemetryError::Query(detail)) => {
                ErrorBody::new("InfluxDB query error", detail.clone())
            }
            Self::Telemetry(e @ TelemetryError::Closed) => {
                ErrorBody::new("InfluxDB query error", e.to_string())
            }
            Self::Provision(e) => provision_body(e),
        }
    }
}

fn vsphere_body(err: &VsphereError) -> ErrorBody {
    match err {
        VsphereError::UpstreamRejected { status, body, .. } => ErrorBody {
            error: "VMware API rejected the request".into(),
            details: err.to_string(),
            upstream_status: Some(*status),
            upstream_body: Some(body.clone()),
        },
        VsphereError::UpstreamUnavailable { .. } => {
            ErrorBody::new("VMware API request error", err.to_string())
        }
        VsphereError::Protocol { .. } => {
            ErrorBody::new("Unexpected VMware API response", err.to_string())
        }
        VsphereError::Internal { .. } | VsphereError::Validation(_) => {
            ErrorBody::new("Internal Server Error", err.to_string())
        }
    }
}

fn provision_body(err: &ProvisionError) -> ErrorBody {
    match err {
        ProvisionError::PhaseFailed { stderr, .. } => {
            ErrorBody::new(err.to_string(), stderr.clone())
        }
        ProvisionError::TimedOut { .. } => ErrorBody::new("Terraform timed out", err.to_string()),
        ProvisionError::Spawn { .. } | ProvisionError::WorkingDirMissing(_) => {
            ErrorBody::new("Provisioning could not start", err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}
