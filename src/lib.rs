//! NAS Provisioner - NFS-backed volumes for Kubernetes
//!
//! An external provisioner that allocates per-claim directories on NFS
//! exports and reclaims them (archive or remove) when volumes are released.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                           Kubernetes Controller                              │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────────────────┐   │
//! │  │     Claim Reconciler        │  │        Volume Reconciler            │   │
//! │  │  (PVC -> PersistentVolume)  │  │   (Released PV -> reclaim)          │   │
//! │  └──────────────┬──────────────┘  └──────────────────┬──────────────────┘   │
//! ├─────────────────┼────────────────────────────────────┼──────────────────────┤
//! │                 │        Volume Lifecycle            │                      │
//! │        ┌────────┴────────┐                 ┌─────────┴─────────┐            │
//! │        │    Provision    │                 │      Delete       │            │
//! │        └────────┬────────┘                 └─────────┬─────────┘            │
//! ├─────────────────┼────────────────────────────────────┼──────────────────────┤
//! │  ┌──────────────┴───┐  ┌─────────────────┐  ┌────────┴────────────────┐     │
//! │  │ Server Pool +    │  │  Path Planner   │  │  Mount Session          │     │
//! │  │ Server Selector  │  │                 │  │  (mount / umount)       │     │
//! │  └──────────────────┘  └─────────────────┘  └─────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controller`]: Kubernetes reconcilers and resource translation
//! - [`provisioner`]: Provision and delete
//! - [`nfs`]: Server pools, selection, paths, and local mounts
//! - [`domain`]: Core data model and ports
//! - [`error`]: Error types and handling

pub mod controller;
pub mod domain;
pub mod error;
pub mod nfs;
pub mod provisioner;

// Re-export commonly used types
pub use controller::{Context, ControllerMetrics};

pub use domain::ports::{
    CommandRunner, CommandRunnerRef, NfsVersion, ProtocolFamily, ProvisionRequest,
    ProvisionResponse, ServerRecord, StorageClassRef, VolumeDescriptor,
};

pub use error::{Error, ErrorAction, Result};

pub use nfs::{MountSession, SelectionStrategy, ServerSelector, ShellRunner};

pub use provisioner::{NasProvisioner, ProvisionerConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
