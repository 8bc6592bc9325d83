//! Domain types for hardware reconfiguration.
//!
//! Everything here lives for the duration of a single gateway request.

use std::fmt;
use std::num::{NonZeroU32, NonZeroU64};

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use crate::error::{VsphereError, VsphereResult};

// ── Session ────────────────────────────────────────────────────────

/// Opaque session credential issued by the control plane.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

// ── VM identity ────────────────────────────────────────────────────

/// Identifier of a VM in the control plane (e.g. `vm-123`).
///
/// Only non-emptiness is checked locally; unknown ids are reported by the
/// control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmId(String);

impl VmId {
    pub fn new(id: impl Into<String>) -> VsphereResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(VsphereError::Validation("vm id must not be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Hardware changes ───────────────────────────────────────────────

/// Category of VM hardware being changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HardwareKind {
    Memory,
    Cpu,
}

impl HardwareKind {
    /// Path segment under `/hardware/`.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Cpu => "cpu",
        }
    }

    /// Name used in the gateway's success message.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Memory => "Memory",
            Self::Cpu => "CPU",
        }
    }

    /// Message attached to an empty-body success.
    pub fn synthesized_message(self) -> &'static str {
        match self {
            Self::Memory => "Memory updated successfully",
            Self::Cpu => "Cpu updated successfully",
        }
    }
}

impl fmt::Display for HardwareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// A validated hardware change. Zero values cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareChange {
    Memory {
        size_mib: NonZeroU64,
    },
    Cpu {
        count: NonZeroU32,
        cores_per_socket: NonZeroU32,
        hot_add_enabled: bool,
    },
}

impl HardwareChange {
    pub fn kind(&self) -> HardwareKind {
        match self {
            Self::Memory { .. } => HardwareKind::Memory,
            Self::Cpu { .. } => HardwareKind::Cpu,
        }
    }

    /// The `spec` object the control plane expects for this change.
    pub fn spec(&self) -> Value {
        match self {
            Self::Memory { size_mib } => json!({ "size_MiB": size_mib.get() }),
            Self::Cpu {
                count,
                cores_per_socket,
                hot_add_enabled,
            } => json!({
                "count": count.get(),
                "cores_per_socket": cores_per_socket.get(),
                "hot_add_enabled": hot_add_enabled,
            }),
        }
    }

    /// Full PATCH body: `{"spec": {...}}`.
    pub fn request_body(&self) -> Value {
        json!({ "spec": self.spec() })
    }
}

// ── Results ────────────────────────────────────────────────────────

/// Outcome of a successful hardware PATCH.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareUpdateResult {
    /// The control plane returned a JSON body; passed through verbatim.
    Upstream(Value),
    /// The control plane returned 2xx with no body.
    Synthesized { kind: HardwareKind },
}

impl HardwareUpdateResult {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Upstream(body) => body.clone(),
            Self::Synthesized { kind } => json!({ "message": kind.synthesized_message() }),
        }
    }
}

impl Serialize for HardwareUpdateResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Upstream(body) => body.serialize(serializer),
            Self::Synthesized { .. } => self.to_value().serialize(serializer),
        }
    }
}
