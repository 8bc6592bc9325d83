//! InfluxDB query client with an explicit lifecycle.

use std::sync::Mutex;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::config::InfluxConfig;
use crate::error::{TelemetryError, TelemetryResult};
use crate::query::RangeQuery;
use crate::series::{SeriesPoint, parse_series};

enum ClientSlot {
    /// No query has run yet.
    Idle,
    Ready(Client),
    Closed,
}

/// Owner of the time-series store connection.
///
/// The HTTP client is built on the first query and shared by later ones
/// (cloning a `reqwest::Client` shares its pool). [`shutdown`](Self::shutdown)
/// drops it; queries afterwards fail with [`TelemetryError::Closed`].
pub struct TelemetryStore {
    config: InfluxConfig,
    client: Mutex<ClientSlot>,
}

impl TelemetryStore {
    pub fn new(config: InfluxConfig) -> Self {
        Self {
            config,
            client: Mutex::new(ClientSlot::Idle),
        }
    }

    pub fn config(&self) -> &InfluxConfig {
        &self.config
    }

    /// Whether the underlying client has been built and not yet released.
    pub fn is_connected(&self) -> bool {
        matches!(*self.lock(), ClientSlot::Ready(_))
    }

    /// Release the client. Idempotent.
    pub fn shutdown(&self) {
        let mut slot = self.lock();
        if !matches!(*slot, ClientSlot::Closed) {
            *slot = ClientSlot::Closed;
            info!(target_system = "influxdb", url = %self.config.url, "telemetry store closed");
        }
    }

    /// Run `query` and return its points in store order.
    pub async fn query_series(&self, query: &RangeQuery) -> TelemetryResult<Vec<SeriesPoint>> {
        let client = self.client()?;

        let result = self.execute(&client, query).await;
        match &result {
            Ok(points) => debug!(
                target_system = "influxdb",
                operation = "query_series",
                vmname = query.vmname(),
                measurement = query.metric().measurement(),
                points = points.len(),
                "range query complete"
            ),
            Err(e) => error!(
                target_system = "influxdb",
                operation = "query_series",
                vmname = query.vmname(),
                measurement = query.metric().measurement(),
                error = %e,
                "range query failed"
            ),
        }
        result
    }

    async fn execute(
        &self,
        client: &Client,
        query: &RangeQuery,
    ) -> TelemetryResult<Vec<SeriesPoint>> {
        let response = client
            .post(self.config.query_url())
            .query(&[("org", self.config.org.as_str())])
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .header(ACCEPT, "application/csv")
            .json(&self.request_body(query))
            .send()
            .await
            .map_err(|e| query_error(&e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| query_error(&e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(query_error(&format!("status {status}: {}", error_message(&body))));
        }

        parse_series(&body)
    }

    fn request_body(&self, query: &RangeQuery) -> Value {
        json!({
            "query": query.flux(),
            "type": "flux",
            "params": query.params(&self.config.bucket),
            "dialect": {
                "header": true,
                "annotations": [],
                "delimiter": ",",
                "dateTimeFormat": "RFC3339",
            },
        })
    }

    fn client(&self) -> TelemetryResult<Client> {
        let mut slot = self.lock();
        match &*slot {
            ClientSlot::Ready(client) => Ok(client.clone()),
            ClientSlot::Closed => Err(TelemetryError::Closed),
            ClientSlot::Idle => {
                let client = Client::builder()
                    .timeout(self.config.timeout)
                    .build()
                    .map_err(|e| query_error(&format!("failed to build HTTP client: {e}")))?;
                debug!(
                    target_system = "influxdb",
                    url = %self.config.url,
                    "telemetry client created"
                );
                *slot = ClientSlot::Ready(client.clone());
                Ok(client)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ClientSlot> {
        self.client.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn query_error(detail: &str) -> TelemetryError {
    TelemetryError::Query(detail.to_string())
}

// InfluxDB error bodies look like `{"code": "...", "message": "..."}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
