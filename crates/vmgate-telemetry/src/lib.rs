//! vmgate-telemetry — VM usage series from InfluxDB.
//!
//! Issues one Flux range query per request against the configured bucket
//! and reshapes the result rows into an ordered `[{time, value}]` series.
//!
//! # Architecture
//!
//! ```text
//! RangeQuery (vmname, start, stop, metric)
//!   ├── validate()  → start/stop checked against a closed grammar
//!   ├── flux()      → fixed template, no caller text interpolated
//!   └── params()    → bucket + vmname bound as Flux `params`
//!
//! TelemetryStore
//!   ├── lazily built HTTP client (first query)
//!   ├── query_series() → POST /api/v2/query → CSV → Vec<SeriesPoint>
//!   └── shutdown()     → releases the client; later queries fail `Closed`
//! ```
//!
//! Rows arrive already aggregated to one-minute means with empty windows
//! dropped by the store. Ordering is the store's (ascending by time).

pub mod config;
pub mod error;
pub mod query;
pub mod series;
pub mod store;

pub use config::InfluxConfig;
pub use error::{TelemetryError, TelemetryResult};
pub use query::{Metric, RangeQuery};
pub use series::SeriesPoint;
pub use store::TelemetryStore;
