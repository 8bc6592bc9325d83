//! Usage series handlers backed by the telemetry store.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use vmgate_telemetry::query::{DEFAULT_START, DEFAULT_STOP};
use vmgate_telemetry::{Metric, RangeQuery};

use crate::ApiState;
use crate::error::ApiError;

/// Body of `POST /vsphere/memory` and `POST /vsphere/cpu`.
#[derive(Debug, Clone, Deserialize)]
pub struct VmRequest {
    pub vmname: String,
    #[serde(default = "default_start")]
    pub start: String,
    #[serde(default = "default_stop")]
    pub stop: String,
}

fn default_start() -> String {
    DEFAULT_START.to_string()
}

fn default_stop() -> String {
    DEFAULT_STOP.to_string()
}

/// POST /vsphere/memory
pub async fn memory_usage(
    State(state): State<ApiState>,
    body: Result<Json<VmRequest>, JsonRejection>,
) -> impl IntoResponse {
    usage(&state, body, Metric::Memory, "memory_usage").await
}

/// POST /vsphere/cpu
pub async fn cpu_usage(
    State(state): State<ApiState>,
    body: Result<Json<VmRequest>, JsonRejection>,
) -> impl IntoResponse {
    usage(&state, body, Metric::Cpu, "cpu_usage").await
}

async fn usage(
    state: &ApiState,
    body: Result<Json<VmRequest>, JsonRejection>,
    metric: Metric,
    field: &str,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => return ApiError::Validation(rejection.body_text()).into_response(),
    };

    let query = match RangeQuery::new(&req.vmname, &req.start, &req.stop, metric) {
        Ok(query) => query,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match state.telemetry.query_series(&query).await {
        Ok(points) => Json(json!({
            "vmname": req.vmname,
            field: points,
        }))
        .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::Value;
    use vmgate_provision::{ProvisionConfig, ProvisioningTrigger};
    use vmgate_telemetry::{InfluxConfig, TelemetryStore};
    use vmgate_vsphere::{VsphereClient, VsphereConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CPU_CSV: &str = "\
,result,table,_start,_stop,_time,_value,_field,_measurement,vmname
,mean,0,2024-05-01T11:00:00Z,2024-05-01T12:00:00Z,2024-05-01T11:01:00Z,12.25,usage_average,vsphere_vm_cpu,db02
";

    fn test_state(influx_uri: &str) -> ApiState {
        let vsphere = VsphereClient::new(VsphereConfig::new("http://127.0.0.1:1", "u", "p"));
        let telemetry = TelemetryStore::new(InfluxConfig::new(influx_uri, "t", "lab", "vsphere"));
        let provisioner = ProvisioningTrigger::new(ProvisionConfig::new("/nonexistent"));
        ApiState::new(vsphere, Arc::new(telemetry), Arc::new(provisioner))
    }

    fn request(vmname: &str, start: &str) -> VmRequest {
        VmRequest {
            vmname: vmname.into(),
            start: start.into(),
            stop: DEFAULT_STOP.into(),
        }
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn range_defaults_apply_when_omitted() {
        let req: VmRequest = serde_json::from_value(json!({"vmname": "web01"})).unwrap();
        assert_eq!(req.start, "-1h");
        assert_eq!(req.stop, "now()");
    }

    #[tokio::test]
    async fn cpu_usage_returns_series_under_cpu_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v2/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CPU_CSV))
            .mount(&server)
            .await;

        let resp = cpu_usage(State(test_state(&server.uri())), Ok(Json(request("db02", "-1h"))))
            .await
            .into_response();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["vmname"], "db02");
        assert_eq!(body["cpu_usage"][0]["value"], 12.25);
        assert_eq!(body["cpu_usage"][0]["time"], "2024-05-01T11:01:00Z");
        assert!(body.get("memory_usage").is_none());
    }

    #[tokio::test]
    async fn injected_range_is_rejected_before_querying() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let resp = memory_usage(
            State(test_state(&server.uri())),
            Ok(Json(request("web01", "-1h) |> drop(columns: [\"_value\"]"))),
        )
        .await
        .into_response();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn store_failure_is_500_query_error() {
        let resp = memory_usage(
            State(test_state("http://127.0.0.1:1")),
            Ok(Json(request("web01", "-1h"))),
        )
        .await
        .into_response();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await["error"], "InfluxDB query error");
    }
}
