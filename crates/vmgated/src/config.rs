//! Gateway configuration.
//!
//! Values come from an optional TOML file, then from the process
//! environment (which includes anything `dotenvy` loaded from `.env`).
//! Environment variables win over file values.
//!
//! ```toml
//! [vmware]
//! api_host = "vcenter.lab.local"
//! user = "administrator@vsphere.local"
//! password = "..."
//! insecure_skip_verify = false
//! timeout_secs = 30
//!
//! [influx]
//! url = "http://influx:8086"
//! token = "..."
//! org = "lab"
//! bucket = "vsphere"
//!
//! [terraform]
//! dir = "/srv/terraform/vm"
//! bin = "terraform"
//! timeout_secs = 600
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use vmgate_provision::ProvisionConfig;
use vmgate_telemetry::InfluxConfig;
use vmgate_vsphere::VsphereConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ── File layout ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    vmware: VmwareSection,
    influx: InfluxSection,
    terraform: TerraformSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct VmwareSection {
    api_host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    insecure_skip_verify: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct InfluxSection {
    url: Option<String>,
    token: Option<String>,
    org: Option<String>,
    bucket: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct TerraformSection {
    dir: Option<PathBuf>,
    bin: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

// ── Resolved configuration ─────────────────────────────────────────

/// Fully resolved settings for every downstream system.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub vsphere: VsphereConfig,
    pub influx: InfluxConfig,
    pub provision: ProvisionConfig,
}

impl GatewayConfig {
    /// Load from an optional file plus the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Load with an explicit variable lookup.
    pub fn resolve(
        file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) => read_file(path)?,
            None => FileConfig::default(),
        };
        let env = Env(env);

        let vmware = file.vmware;
        let host = env.string("VMWARE_API_HOST", vmware.api_host)?;
        let user = env.string("VMWARE_USER", vmware.user)?;
        let password = env.string("VMWARE_PASSWORD", vmware.password)?;
        let insecure = env
            .parsed("VMWARE_INSECURE_SKIP_VERIFY", vmware.insecure_skip_verify)?
            .unwrap_or(false);
        let mut vsphere =
            VsphereConfig::new(&host, &user, &password).with_insecure_skip_verify(insecure);
        if let Some(secs) = env.parsed("VMWARE_TIMEOUT_SECS", vmware.timeout_secs)? {
            vsphere = vsphere.with_timeout(Duration::from_secs(secs));
        }

        let influx_section = file.influx;
        let mut influx = InfluxConfig::new(
            &env.string("INFLUX_URL", influx_section.url)?,
            &env.string("INFLUX_TOKEN", influx_section.token)?,
            &env.string("ORG", influx_section.org)?,
            &env.string("BUCKET", influx_section.bucket)?,
        );
        if let Some(secs) = env.parsed("INFLUX_TIMEOUT_SECS", influx_section.timeout_secs)? {
            influx = influx.with_timeout(Duration::from_secs(secs));
        }

        let terraform = file.terraform;
        let dir = env
            .raw("TERRAFORM_DIR")
            .map(PathBuf::from)
            .or(terraform.dir)
            .ok_or(ConfigError::Missing("TERRAFORM_DIR"))?;
        let mut provision = ProvisionConfig::new(dir);
        if let Some(bin) = env.raw("TERRAFORM_BIN").map(PathBuf::from).or(terraform.bin) {
            provision = provision.with_binary(bin);
        }
        if let Some(secs) = env.parsed("TERRAFORM_TIMEOUT_SECS", terraform.timeout_secs)? {
            provision = provision.with_phase_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            vsphere,
            influx,
            provision,
        })
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Non-empty value of `name`, if set.
    fn raw(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, name: &'static str, file: Option<String>) -> Result<String, ConfigError> {
        self.raw(name)
            .or(file.filter(|v| !v.trim().is_empty()))
            .ok_or(ConfigError::Missing(name))
    }

    fn parsed<T: FromStr>(
        &self,
        name: &'static str,
        file: Option<T>,
    ) -> Result<Option<T>, ConfigError> {
        match self.raw(name) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(file),
        }
    }
}
