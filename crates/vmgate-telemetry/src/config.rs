//! InfluxDB connection settings.

use std::fmt;
use std::time::Duration;

/// Default bound on a single range query.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct InfluxConfig {
    /// Server URL, e.g. `http://influx:8086`. No trailing slash.
    pub url: String,
    /// API token sent as `Authorization: Token ...`.
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub timeout: Duration,
}

impl InfluxConfig {
    pub fn new(url: &str, token: &str, org: &str, bucket: &str) -> Self {
        Self {
            url: url.trim().trim_end_matches('/').to_string(),
            token: token.to_string(),
            org: org.to_string(),
            bucket: bucket.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn query_url(&self) -> String {
        format!("{}/api/v2/query", self.url)
    }
}

impl fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}
