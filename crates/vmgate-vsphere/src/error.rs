//! Error types for control-plane operations.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for control-plane operations.
pub type VsphereResult<T> = Result<T, VsphereError>;

/// Errors that can occur while talking to the control plane.
///
/// `operation` names the call that failed (`acquire_session`,
/// `update_hardware`) so log lines can be matched against the control
/// plane's own records.
#[derive(Debug, Error)]
pub enum VsphereError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{operation}: control plane unreachable: {message}")]
    UpstreamUnavailable {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: control plane rejected the request with status {status}")]
    UpstreamRejected {
        operation: &'static str,
        status: u16,
        body: Value,
    },

    #[error("{operation}: unexpected control plane response: {message}")]
    Protocol {
        operation: &'static str,
        message: String,
    },

    #[error("{operation}: internal error: {message}")]
    Internal {
        operation: &'static str,
        message: String,
    },
}

impl VsphereError {
    /// Classify a reqwest failure.
    pub(crate) fn from_reqwest(operation: &'static str, err: reqwest::Error) -> Self {
        let builder = err.is_builder();
        let transport = err.is_timeout() || err.is_connect() || err.is_request() || err.is_body();
        let decode = err.is_decode();
        let message = err.without_url().to_string();

        if builder {
            Self::Internal { operation, message }
        } else if transport {
            Self::UpstreamUnavailable { operation, message }
        } else if decode {
            Self::Protocol { operation, message }
        } else {
            Self::Internal { operation, message }
        }
    }

    /// Build an `UpstreamRejected` from a non-2xx response body.
    ///
    /// JSON bodies are kept structured; anything else is carried as a string.
    pub(crate) fn rejected(operation: &'static str, status: StatusCode, body: &[u8]) -> Self {
        let body = serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()));
        Self::UpstreamRejected {
            operation,
            status: status.as_u16(),
            body,
        }
    }

    pub(crate) fn protocol(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Protocol {
            operation,
            message: message.into(),
        }
    }
}
