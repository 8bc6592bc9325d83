//! Hardware reconfiguration workflow.
//!
//! One request walks a fixed sequence:
//!
//! ```text
//! Validating ──► AcquiringSession ──► Applying ──► Done
//!     │                 │                 │
//!     └─────────────────┴─────────────────┴──► Failed
//! ```
//!
//! Validation failures never leave the process. A failed session
//! acquisition means no hardware call is made. The single hardware call is
//! either fully successful or its upstream failure is reported as-is; there
//! is nothing to roll back.

use std::fmt;
use std::num::{NonZeroU32, NonZeroU64};
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use vmgate_vsphere::{
    HardwareChange, HardwareExecutor, HardwareUpdateResult, SessionProvider, VmId,
};

use crate::error::ApiError;

// ── Request bodies ─────────────────────────────────────────────────

/// Body of `PATCH /vsphere/vm/{vm_id}/memory`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryUpdateRequest {
    #[serde(rename = "size_MiB", deserialize_with = "integral")]
    pub size_mib: i64,
}

/// Body of `PATCH /vsphere/vm/{vm_id}/cpu`.
#[derive(Debug, Clone, Deserialize)]
pub struct CpuUpdateRequest {
    #[serde(deserialize_with = "integral")]
    pub count: i64,
    #[serde(deserialize_with = "integral")]
    pub cores_per_socket: i64,
    #[serde(default = "default_hot_add")]
    pub hot_add_enabled: bool,
}

fn default_hot_add() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Integral {
    Int(i64),
    Float(f64),
}

/// Accept JSON integers and integral floats such as `4096.0`.
fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Integral::deserialize(deserializer)? {
        Integral::Int(v) => Ok(v),
        Integral::Float(v)
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 =>
        {
            Ok(v as i64)
        }
        Integral::Float(v) => Err(D::Error::custom(format!("expected an integer, got {v}"))),
    }
}

/// Unvalidated hardware change as received from the caller.
#[derive(Debug, Clone)]
pub enum HardwareRequest {
    Memory(MemoryUpdateRequest),
    Cpu(CpuUpdateRequest),
}

impl From<MemoryUpdateRequest> for HardwareRequest {
    fn from(req: MemoryUpdateRequest) -> Self {
        Self::Memory(req)
    }
}

impl From<CpuUpdateRequest> for HardwareRequest {
    fn from(req: CpuUpdateRequest) -> Self {
        Self::Cpu(req)
    }
}

impl HardwareRequest {
    /// Enforce the positivity invariants.
    pub fn validate(&self) -> Result<HardwareChange, ApiError> {
        match self {
            Self::Memory(req) => Ok(HardwareChange::Memory {
                size_mib: positive_u64("size_MiB", req.size_mib)?,
            }),
            Self::Cpu(req) => Ok(HardwareChange::Cpu {
                count: positive_u32("count", req.count)?,
                cores_per_socket: positive_u32("cores_per_socket", req.cores_per_socket)?,
                hot_add_enabled: req.hot_add_enabled,
            }),
        }
    }
}

fn positive_u64(field: &str, value: i64) -> Result<NonZeroU64, ApiError> {
    u64::try_from(value)
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or_else(|| not_positive(field, value))
}

fn positive_u32(field: &str, value: i64) -> Result<NonZeroU32, ApiError> {
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| not_positive(field, value))
}

fn not_positive(field: &str, value: i64) -> ApiError {
    ApiError::Validation(format!("{field} must be a positive integer, got {value}"))
}

// ── Workflow ───────────────────────────────────────────────────────

/// Where a reconfiguration request stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    AcquiringSession,
    Applying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating",
            Self::AcquiringSession => "acquiring_session",
            Self::Applying => "applying",
        })
    }
}

/// A request that ended in `Failed`, with the stage it failed in.
#[derive(Debug)]
pub struct ReconfigureFailure {
    pub stage: Stage,
    pub error: ApiError,
}

impl From<ReconfigureFailure> for ApiError {
    fn from(failure: ReconfigureFailure) -> Self {
        failure.error
    }
}

/// Envelope returned on `Done`.
#[derive(Debug, Clone, Serialize)]
pub struct ReconfigureResponse {
    pub message: String,
    pub vm: HardwareUpdateResult,
}

/// Orchestrates session acquisition and the hardware call.
#[derive(Clone)]
pub struct Reconfigurer {
    sessions: Arc<dyn SessionProvider>,
    executor: Arc<dyn HardwareExecutor>,
}

impl Reconfigurer {
    pub fn new(sessions: Arc<dyn SessionProvider>, executor: Arc<dyn HardwareExecutor>) -> Self {
        Self { sessions, executor }
    }

    pub async fn reconfigure(
        &self,
        vm_id: &str,
        request: impl Into<HardwareRequest>,
    ) -> Result<ReconfigureResponse, ReconfigureFailure> {
        let request = request.into();

        let (vm_id, change) = validate(vm_id, &request).map_err(|error| {
            debug!(%vm_id, error = %error, "reconfiguration rejected");
            ReconfigureFailure {
                stage: Stage::Validating,
                error,
            }
        })?;
        let kind = change.kind();

        debug!(%vm_id, %kind, stage = %Stage::AcquiringSession, "reconfiguration");
        let token = self
            .sessions
            .acquire_session()
            .await
            .map_err(|e| fail(Stage::AcquiringSession, &vm_id, e.into()))?;

        debug!(%vm_id, %kind, stage = %Stage::Applying, "reconfiguration");
        let result = self
            .executor
            .apply(&vm_id, &change, &token)
            .await
            .map_err(|e| fail(Stage::Applying, &vm_id, e.into()))?;

        debug!(%vm_id, %kind, "reconfiguration done");
        Ok(ReconfigureResponse {
            message: format!("{} updated successfully", kind.display_name()),
            vm: result,
        })
    }
}

fn validate(vm_id: &str, request: &HardwareRequest) -> Result<(VmId, HardwareChange), ApiError> {
    let vm_id = VmId::new(vm_id)?;
    let change = request.validate()?;
    Ok((vm_id, change))
}

fn fail(stage: Stage, vm_id: &VmId, error: ApiError) -> ReconfigureFailure {
    warn!(%vm_id, %stage, error = %error, "reconfiguration failed");
    ReconfigureFailure { stage, error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vmgate_vsphere::{HardwareKind, SessionToken, VsphereError, VsphereResult};

    #[derive(Default)]
    struct FakeSessions {
        calls: AtomicUsize,
        unavailable: bool,
    }

    #[async_trait]
    impl SessionProvider for FakeSessions {
        async fn acquire_session(&self) -> VsphereResult<SessionToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(VsphereError::UpstreamUnavailable {
                    operation: "acquire_session",
                    message: "connection refused".into(),
                });
            }
            Ok(SessionToken::new("tok"))
        }
    }

    struct FakeExecutor {
        calls: AtomicUsize,
        respond: fn(&HardwareChange) -> VsphereResult<HardwareUpdateResult>,
    }

    impl FakeExecutor {
        fn new(respond: fn(&HardwareChange) -> VsphereResult<HardwareUpdateResult>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                respond,
            }
        }
    }

    #[async_trait]
    impl HardwareExecutor for FakeExecutor {
        async fn apply(
            &self,
            _vm_id: &VmId,
            change: &HardwareChange,
            token: &SessionToken,
        ) -> VsphereResult<HardwareUpdateResult> {
            assert_eq!(token.as_str(), "tok");
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(change)
        }
    }

    fn echo(change: &HardwareChange) -> VsphereResult<HardwareUpdateResult> {
        Ok(HardwareUpdateResult::Upstream(change.spec()))
    }

    fn setup(
        sessions: FakeSessions,
        respond: fn(&HardwareChange) -> VsphereResult<HardwareUpdateResult>,
    ) -> (Arc<FakeSessions>, Arc<FakeExecutor>, Reconfigurer) {
        let sessions = Arc::new(sessions);
        let executor = Arc::new(FakeExecutor::new(respond));
        let reconfigurer = Reconfigurer::new(sessions.clone(), executor.clone());
        (sessions, executor, reconfigurer)
    }

    fn cpu(count: i64, cores_per_socket: i64) -> CpuUpdateRequest {
        CpuUpdateRequest {
            count,
            cores_per_socket,
            hot_add_enabled: true,
        }
    }

    #[tokio::test]
    async fn non_positive_cpu_values_make_no_outbound_calls() {
        for (count, cores) in [(0, 1), (-1, 1), (1, 0), (2, -4), (0, 0)] {
            let (sessions, executor, reconfigurer) = setup(FakeSessions::default(), echo);

            let failure = reconfigurer
                .reconfigure("vm-1", cpu(count, cores))
                .await
                .unwrap_err();

            assert_eq!(failure.stage, Stage::Validating);
            assert!(matches!(failure.error, ApiError::Validation(_)));
            assert_eq!(sessions.calls.load(Ordering::SeqCst), 0);
            assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn non_positive_memory_is_rejected() {
        let (sessions, _, reconfigurer) = setup(FakeSessions::default(), echo);
        let failure = reconfigurer
            .reconfigure("vm-1", MemoryUpdateRequest { size_mib: 0 })
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Validating);
        assert_eq!(sessions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_vm_id_is_rejected() {
        let (sessions, _, reconfigurer) = setup(FakeSessions::default(), echo);
        let failure = reconfigurer
            .reconfigure("", MemoryUpdateRequest { size_mib: 1024 })
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Validating);
        assert_eq!(failure.error.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(sessions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn session_failure_never_reaches_applying() {
        let sessions = FakeSessions {
            unavailable: true,
            ..Default::default()
        };
        let (sessions, executor, reconfigurer) = setup(sessions, echo);

        let failure = reconfigurer
            .reconfigure("vm-1", MemoryUpdateRequest { size_mib: 2048 })
            .await
            .unwrap_err();

        assert_eq!(failure.stage, Stage::AcquiringSession);
        assert!(matches!(
            failure.error,
            ApiError::Vsphere(VsphereError::UpstreamUnavailable { .. })
        ));
        assert_eq!(sessions.calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upstream_rejection_is_reported_without_retry() {
        let (sessions, executor, reconfigurer) = setup(FakeSessions::default(), |_| {
            Err(VsphereError::UpstreamRejected {
                operation: "update_hardware",
                status: 400,
                body: json!({"error": "invalid spec"}),
            })
        });

        let failure = reconfigurer.reconfigure("vm-1", cpu(2, 1)).await.unwrap_err();

        assert_eq!(failure.stage, Stage::Applying);
        match failure.error {
            ApiError::Vsphere(VsphereError::UpstreamRejected { status, body, .. }) => {
                assert_eq!(status, 400);
                assert_eq!(body, json!({"error": "invalid spec"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sessions.calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cpu_success_wraps_result_in_envelope() {
        let (_, _, reconfigurer) = setup(FakeSessions::default(), |change| {
            Ok(HardwareUpdateResult::Synthesized { kind: change.kind() })
        });

        let response = reconfigurer.reconfigure("vm-9", cpu(4, 2)).await.unwrap();

        assert_eq!(response.message, "CPU updated successfully");
        assert_eq!(
            response.vm,
            HardwareUpdateResult::Synthesized {
                kind: HardwareKind::Cpu
            }
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "message": "CPU updated successfully",
                "vm": {"message": "Cpu updated successfully"}
            })
        );
    }

    #[test]
    fn integral_floats_are_accepted() {
        let req: MemoryUpdateRequest =
            serde_json::from_value(json!({"size_MiB": 4096.0})).unwrap();
        assert_eq!(req.size_mib, 4096);

        let req: CpuUpdateRequest =
            serde_json::from_value(json!({"count": 2.0, "cores_per_socket": 1})).unwrap();
        assert_eq!((req.count, req.cores_per_socket), (2, 1));
    }

    #[test]
    fn fractional_and_non_numeric_values_are_rejected() {
        for size in [json!(4096.5), json!("4096"), json!(null)] {
            let parsed = serde_json::from_value::<MemoryUpdateRequest>(json!({"size_MiB": size}));
            assert!(parsed.is_err(), "{size} should be rejected");
        }
    }

    #[test]
    fn hot_add_defaults_to_enabled() {
        let req: CpuUpdateRequest =
            serde_json::from_value(json!({"count": 2, "cores_per_socket": 1})).unwrap();
        assert!(req.hot_add_enabled);
    }
}
