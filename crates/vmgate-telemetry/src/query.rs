//! Range query construction.
//!
//! The Flux text is a fixed template. The VM name and bucket travel in the
//! request's `params` object and are referenced as `params.vmname` and
//! `params.bucket`, so caller text never becomes Flux source. The range
//! bounds must be Flux literals (`range()` rejects string params), so they
//! are only accepted after matching a closed grammar.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::error::{TelemetryError, TelemetryResult};

/// Default range start when the caller omits one.
pub const DEFAULT_START: &str = "-1h";
/// Default range stop when the caller omits one.
pub const DEFAULT_STOP: &str = "now()";

/// Field holding the averaged usage value in both measurements.
const USAGE_FIELD: &str = "usage_average";

// Relative duration: optional sign, then one or more <int><unit> groups.
static DURATION_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:[0-9]+(?:ns|us|µs|ms|mo|s|m|h|d|w|y))+$").expect("valid duration regex")
});

/// Which usage series to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Memory,
    Cpu,
}

impl Metric {
    pub fn measurement(self) -> &'static str {
        match self {
            Self::Memory => "vsphere_vm_mem",
            Self::Cpu => "vsphere_vm_cpu",
        }
    }
}

/// A validated range query for one VM and one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    vmname: String,
    start: String,
    stop: String,
    metric: Metric,
}

impl RangeQuery {
    pub fn new(vmname: &str, start: &str, stop: &str, metric: Metric) -> TelemetryResult<Self> {
        if vmname.trim().is_empty() {
            return Err(TelemetryError::MissingVmName);
        }
        Ok(Self {
            vmname: vmname.to_string(),
            start: validate_bound("start", start)?,
            stop: validate_bound("stop", stop)?,
            metric,
        })
    }

    pub fn vmname(&self) -> &str {
        &self.vmname
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Flux source for this query.
    pub fn flux(&self) -> String {
        format!(
            r#"from(bucket: params.bucket)
  |> range(start: {start}, stop: {stop})
  |> filter(fn: (r) => r["_measurement"] == "{measurement}")
  |> filter(fn: (r) => r["_field"] == "{field}")
  |> filter(fn: (r) => r["vmname"] == params.vmname)
  |> aggregateWindow(every: 1m, fn: mean, createEmpty: false)
  |> yield(name: "mean")"#,
            start = self.start,
            stop = self.stop,
            measurement = self.metric.measurement(),
            field = USAGE_FIELD,
        )
    }

    /// Values bound to `params.*` in the Flux source.
    pub fn params(&self, bucket: &str) -> Value {
        json!({
            "bucket": bucket,
            "vmname": self.vmname,
        })
    }
}

/// Accept `now()`, a relative duration (`-2h`, `-1h30m`) or an RFC 3339
/// timestamp. Anything else is refused before it can reach the store.
fn validate_bound(name: &str, raw: &str) -> TelemetryResult<String> {
    let bound = raw.trim();
    if bound == "now()"
        || DURATION_LITERAL.is_match(bound)
        || chrono::DateTime::parse_from_rfc3339(bound).is_ok()
    {
        Ok(bound.to_string())
    } else {
        Err(TelemetryError::InvalidRange(format!(
            "{name} must be now(), a relative duration like -1h, \
             or an RFC 3339 timestamp; got {raw:?}"
        )))
    }
}
