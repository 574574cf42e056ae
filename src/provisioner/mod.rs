//! Volume Lifecycle
//!
//! Provisions volume descriptors onto NFS exports and reclaims their backing
//! directories on delete.
//!
//! Provision is pure planning: nothing is created on the export until the
//! volume is first used. Delete mounts the export root locally, archives or
//! removes the volume directory, and unmounts again.
//!
//! Concurrent deletes for volumes that share a storage class and server use
//! the same local mount point and are not serialised here. A second mount of
//! the same target is tolerated, but one delete can unmount the export while
//! another is still working under it.

pub mod delete;
pub mod provision;

use crate::domain::ports::{CommandRunnerRef, ProtocolFamily};
use crate::nfs::{ServerSelector, ShellRunner};
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// Constants
// =============================================================================

/// Default provisioner identity
pub const DEFAULT_PROVISIONER_NAME: &str = "cds/nas";

/// FlexVolume driver recorded on provisioned volumes
pub const DEFAULT_DRIVER_NAME: &str = "cds/nas";

/// Local root under which exports are mounted during delete
pub const DEFAULT_MOUNT_ROOT: &str = "/persistentvolumes";

/// Export path used when a server entry does not name one
pub const DEFAULT_EXPORT_PATH: &str = "/nfsshare";

/// Default mount options for NFSv3
pub const DEFAULT_V3_OPTIONS: &str = "noresvport,nolock,tcp";

/// Default mount options for NFSv4
pub const DEFAULT_V4_OPTIONS: &str = "noresvport";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the provisioner
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Local mount root for delete
    pub mount_root: PathBuf,
    /// Export path for server entries without one
    pub default_export_path: String,
    /// FlexVolume driver name
    pub driver_name: String,
    /// Mount options when an NFSv3 class sets none
    pub v3_options: String,
    /// Mount options when an NFSv4 class sets none
    pub v4_options: String,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            mount_root: PathBuf::from(DEFAULT_MOUNT_ROOT),
            default_export_path: DEFAULT_EXPORT_PATH.to_string(),
            driver_name: DEFAULT_DRIVER_NAME.to_string(),
            v3_options: DEFAULT_V3_OPTIONS.to_string(),
            v4_options: DEFAULT_V4_OPTIONS.to_string(),
        }
    }
}

impl ProvisionerConfig {
    /// Default mount options for a protocol family
    pub fn default_options(&self, family: ProtocolFamily) -> &str {
        match family {
            ProtocolFamily::V3 => &self.v3_options,
            ProtocolFamily::V4 => &self.v4_options,
        }
    }
}

// =============================================================================
// NAS Provisioner
// =============================================================================

/// Provisions and reclaims NFS-backed volumes
pub struct NasProvisioner {
    config: ProvisionerConfig,
    selector: ServerSelector,
    runner: CommandRunnerRef,
}

impl NasProvisioner {
    /// Create a provisioner that runs host commands through the shell
    pub fn new(config: ProvisionerConfig) -> Self {
        Self::with_runner(config, Arc::new(ShellRunner))
    }

    /// Create a provisioner with a specific command runner
    pub fn with_runner(config: ProvisionerConfig, runner: CommandRunnerRef) -> Self {
        Self {
            config,
            selector: ServerSelector::new(),
            runner,
        }
    }

    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Round-robin state shared by all provision calls
    pub fn selector(&self) -> &ServerSelector {
        &self.selector
    }
}
