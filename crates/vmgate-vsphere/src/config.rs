//! Control-plane connection settings.

use std::fmt;
use std::time::Duration;

/// Default bound on every control-plane round-trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the control plane lives and how to authenticate against it.
#[derive(Clone)]
pub struct VsphereConfig {
    /// Base URL including scheme, without a trailing slash.
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Accept any TLS certificate. Off unless explicitly requested.
    pub insecure_skip_verify: bool,
    /// Per-request timeout for session and hardware calls.
    pub timeout: Duration,
}

impl VsphereConfig {
    /// Build a config for `host`. A bare host name gets an `https://` prefix.
    pub fn new(host: &str, username: &str, password: &str) -> Self {
        Self {
            base_url: normalize_base_url(host),
            username: username.to_string(),
            password: password.to_string(),
            insecure_skip_verify: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join an absolute API path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// The password must never reach logs.
impl fmt::Debug for VsphereConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VsphereConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}
