//! Telemetry error types.

use thiserror::Error;

pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors from telemetry queries.
///
/// Everything that goes wrong once the query leaves the process collapses
/// into `Query`; only caller mistakes and lifecycle misuse are separate.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid time range: {0}")]
    InvalidRange(String),

    #[error("vmname must not be empty")]
    MissingVmName,

    #[error("InfluxDB query error: {0}")]
    Query(String),

    #[error("telemetry store has been shut down")]
    Closed,
}
