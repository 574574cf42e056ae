//! Domain Ports - Core types and trait definitions for the provisioner
//!
//! These types are the boundary between the provisioning logic and the
//! orchestrator that persists its results. The [`CommandRunner`] trait is the
//! port through which the host's mount facility is reached.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Storage Class Parameters
// =============================================================================

/// Storage class parameter keys understood by the provisioner
pub mod params {
    /// Single server address
    pub const SERVER: &str = "server";
    /// Comma-separated list of `address/path` entries
    pub const SERVERS: &str = "servers";
    /// Export path for [`SERVER`]
    pub const PATH: &str = "path";
    /// NFS protocol version
    pub const VERSION: &str = "vers";
    /// Mount options recorded on the volume
    pub const OPTIONS: &str = "options";
    /// Directory mode recorded on the volume
    pub const MODE: &str = "mode";
    /// Server selection strategy
    pub const STRATEGY: &str = "strategy";
    /// Archive instead of remove on delete
    pub const ARCHIVE_ON_DELETE: &str = "archiveOnDelete";
}

/// The storage class a request was made under, reduced to what the
/// provisioner reads from it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClassRef {
    /// Storage class name, also the round-robin selection key
    pub name: String,
    /// Free-form provisioner parameters
    pub parameters: BTreeMap<String, String>,
    /// Reclaim policy for volumes of this class
    pub reclaim_policy: Option<String>,
    /// Class-level mount options passed through to the volume object
    pub mount_options: Vec<String>,
}

impl StorageClassRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a parameter
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

// =============================================================================
// Server Record
// =============================================================================

/// An NFS export server: address plus a root-anchored export path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub address: String,
    pub export_path: String,
}

impl std::fmt::Display for ServerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.export_path)
    }
}

// =============================================================================
// Protocol Version
// =============================================================================

/// NFS protocol family, used to pick default mount options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolFamily {
    V3,
    V4,
}

/// NFS protocol version string as recorded on the volume
///
/// Only major version 3 is normalised; anything else is kept as given so
/// the mount command receives exactly what the storage class asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NfsVersion(String);

impl NfsVersion {
    /// Version used when the storage class does not set one
    pub const DEFAULT: &'static str = "4.0";

    /// Resolve the version requested by a storage class
    pub fn resolve(requested: Option<&str>) -> Self {
        match requested {
            None => Self(Self::DEFAULT.to_string()),
            Some(v) if v.starts_with('3') => Self("3".to_string()),
            Some(v) => Self(v.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn family(&self) -> ProtocolFamily {
        if self.0.starts_with('4') {
            ProtocolFamily::V4
        } else {
            ProtocolFamily::V3
        }
    }
}

impl Default for NfsVersion {
    fn default() -> Self {
        Self::resolve(None)
    }
}

impl From<String> for NfsVersion {
    /// Wrap a version read back from a persisted volume, verbatim
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for NfsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Provisioning Request/Response
// =============================================================================

/// Durable record of one provisioned volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    /// Orchestrator-assigned volume name
    pub volume_name: String,
    /// Server the volume lives on
    pub server: ServerRecord,
    /// Export path of the per-volume directory
    pub remote_path: String,
    /// NFS protocol version
    pub version: NfsVersion,
    /// Mount options for consumers of the volume
    pub mount_options: String,
    /// Directory mode
    pub mode: String,
}

/// Request to provision a volume for a claim
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Namespace of the claim
    pub namespace: String,
    /// Name of the claim
    pub claim_name: String,
    /// Volume name assigned by the orchestrator
    pub volume_name: String,
    /// Storage class the claim references
    pub storage_class: StorageClassRef,
    /// Claim carries a label selector
    pub selector_requested: bool,
    /// Requested access modes
    pub access_modes: Vec<String>,
    /// Requested capacity (e.g. "10Gi")
    pub capacity: Option<String>,
}

/// Result of provisioning: the descriptor plus orchestrator-facing metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionResponse {
    pub descriptor: VolumeDescriptor,
    /// Storage class the volume was provisioned under
    pub storage_class_name: String,
    /// Reclaim policy from the storage class
    pub reclaim_policy: Option<String>,
    pub access_modes: Vec<String>,
    /// Class-level mount options
    pub mount_options: Vec<String>,
    pub capacity: Option<String>,
}

// =============================================================================
// Command Runner Port
// =============================================================================

/// Port for running a host command
///
/// Implementations block until the command exits and return its combined
/// output, or [`crate::Error::CommandFailed`] on a non-zero exit.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<String>;
}

pub type CommandRunnerRef = Arc<dyn CommandRunner>;
