//! Kubernetes Resource Translation
//!
//! Converts between Kubernetes claim/volume/class objects and the
//! provisioner's domain types.

use crate::domain::ports::{
    NfsVersion, ProvisionRequest, ProvisionResponse, ServerRecord, StorageClassRef,
    VolumeDescriptor,
};
use crate::error::{Error, Result};
use crate::nfs::parent_export_path;
use k8s_openapi::api::core::v1::{
    FlexPersistentVolumeSource, ObjectReference, PersistentVolume, PersistentVolumeClaim,
    PersistentVolumeSpec,
};
use k8s_openapi::api::storage::v1::StorageClass;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;

// =============================================================================
// Constants
// =============================================================================

/// Annotation naming the provisioner that created a volume
pub const ANN_PROVISIONED_BY: &str = "pv.kubernetes.io/provisioned-by";

/// Legacy storage class annotation, preferred over `storageClassName`
pub const ANN_BETA_STORAGE_CLASS: &str = "volume.beta.kubernetes.io/storage-class";

/// Capacity resource key
const RESOURCE_STORAGE: &str = "storage";

/// Reclaim policy when the storage class sets none
const DEFAULT_RECLAIM_POLICY: &str = "Delete";

/// FlexVolume option keys
pub mod flex {
    pub const SERVER: &str = "server";
    pub const PATH: &str = "path";
    pub const VERSION: &str = "vers";
    pub const MODE: &str = "mode";
    pub const OPTIONS: &str = "options";
}

// =============================================================================
// Storage Classes
// =============================================================================

/// Reduce a StorageClass to the parts the provisioner reads
pub fn storage_class_ref(class: &StorageClass) -> StorageClassRef {
    StorageClassRef {
        name: class.name_any(),
        parameters: class.parameters.clone().unwrap_or_default(),
        reclaim_policy: class.reclaim_policy.clone(),
        mount_options: class.mount_options.clone().unwrap_or_default(),
    }
}

/// Whether a claim still waits for a volume
///
/// Bound claims and claims being deleted are left alone.
pub fn claim_needs_volume(claim: &PersistentVolumeClaim) -> bool {
    let bound = claim
        .spec
        .as_ref()
        .and_then(|s| s.volume_name.as_deref())
        .is_some_and(|v| !v.is_empty());
    !bound && claim.metadata.deletion_timestamp.is_none()
}

/// Storage class a claim asks for
pub fn claim_class_name(claim: &PersistentVolumeClaim) -> Option<String> {
    claim
        .annotations()
        .get(ANN_BETA_STORAGE_CLASS)
        .cloned()
        .or_else(|| claim.spec.as_ref()?.storage_class_name.clone())
        .filter(|name| !name.is_empty())
}

/// Storage class a volume was provisioned under
pub fn class_name_for_volume(volume: &PersistentVolume) -> Result<String> {
    volume
        .annotations()
        .get(ANN_BETA_STORAGE_CLASS)
        .cloned()
        .or_else(|| volume.spec.as_ref()?.storage_class_name.clone())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::Configuration(format!("volume {} has no storage class", volume.name_any())))
}

// =============================================================================
// Claims -> Requests
// =============================================================================

/// Volume name for a claim, derived from its UID
pub fn volume_name_for_claim(claim: &PersistentVolumeClaim) -> Result<String> {
    claim
        .uid()
        .map(|uid| format!("pvc-{}", uid))
        .ok_or_else(|| Error::Internal(format!("claim {} has no uid", claim.name_any())))
}

/// Build a provision request for a claim
pub fn provision_request(
    claim: &PersistentVolumeClaim,
    class: StorageClassRef,
    volume_name: String,
) -> ProvisionRequest {
    let spec = claim.spec.clone().unwrap_or_default();
    let capacity = spec
        .resources
        .and_then(|r| r.requests)
        .and_then(|mut requests| requests.remove(RESOURCE_STORAGE))
        .map(|q| q.0);

    ProvisionRequest {
        namespace: claim.namespace().unwrap_or_default(),
        claim_name: claim.name_any(),
        volume_name,
        storage_class: class,
        selector_requested: spec.selector.is_some(),
        access_modes: spec.access_modes.unwrap_or_default(),
        capacity,
    }
}

// =============================================================================
// Responses -> Volumes
// =============================================================================

/// Build the PersistentVolume object for a provisioned claim
pub fn build_persistent_volume(
    claim: &PersistentVolumeClaim,
    response: &ProvisionResponse,
    provisioner_name: &str,
    driver_name: &str,
) -> PersistentVolume {
    let descriptor = &response.descriptor;

    let options = BTreeMap::from([
        (flex::SERVER.to_string(), descriptor.server.address.clone()),
        (flex::PATH.to_string(), descriptor.remote_path.clone()),
        (flex::VERSION.to_string(), descriptor.version.to_string()),
        (flex::MODE.to_string(), descriptor.mode.clone()),
        (flex::OPTIONS.to_string(), descriptor.mount_options.clone()),
    ]);

    let capacity = response.capacity.as_ref().map(|c| {
        BTreeMap::from([(RESOURCE_STORAGE.to_string(), Quantity(c.clone()))])
    });

    PersistentVolume {
        metadata: ObjectMeta {
            name: Some(descriptor.volume_name.clone()),
            annotations: Some(BTreeMap::from([(
                ANN_PROVISIONED_BY.to_string(),
                provisioner_name.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            persistent_volume_reclaim_policy: Some(
                response
                    .reclaim_policy
                    .clone()
                    .unwrap_or_else(|| DEFAULT_RECLAIM_POLICY.to_string()),
            ),
            access_modes: Some(response.access_modes.clone()),
            mount_options: Some(response.mount_options.clone()).filter(|o| !o.is_empty()),
            capacity,
            storage_class_name: Some(response.storage_class_name.clone()),
            claim_ref: Some(ObjectReference {
                api_version: Some("v1".to_string()),
                kind: Some("PersistentVolumeClaim".to_string()),
                namespace: claim.namespace(),
                name: Some(claim.name_any()),
                uid: claim.uid(),
                resource_version: claim.resource_version(),
                ..Default::default()
            }),
            flex_volume: Some(FlexPersistentVolumeSource {
                driver: driver_name.to_string(),
                read_only: Some(false),
                options: Some(options),
                ..Default::default()
            }),
            ..Default::default()
        }),
        status: None,
    }
}

// =============================================================================
// Volumes -> Descriptors
// =============================================================================

/// Recover the descriptor recorded on a PersistentVolume
pub fn descriptor_from_volume(volume: &PersistentVolume) -> Result<VolumeDescriptor> {
    let name = volume.name_any();
    let invalid = |reason: &str| Error::InvalidVolume {
        name: name.clone(),
        reason: reason.to_string(),
    };

    let options = volume
        .spec
        .as_ref()
        .and_then(|s| s.flex_volume.as_ref())
        .ok_or_else(|| invalid("no FlexVolume source"))?
        .options
        .clone()
        .unwrap_or_default();

    let address = options
        .get(flex::SERVER)
        .filter(|s| !s.is_empty())
        .cloned()
        .ok_or_else(|| invalid("no server option"))?;
    let remote_path = options
        .get(flex::PATH)
        .filter(|p| !p.is_empty())
        .cloned()
        .ok_or_else(|| invalid("no path option"))?;

    Ok(VolumeDescriptor {
        server: ServerRecord {
            address,
            export_path: parent_export_path(&remote_path),
        },
        version: options
            .get(flex::VERSION)
            .cloned()
            .map(NfsVersion::from)
            .unwrap_or_default(),
        mount_options: options.get(flex::OPTIONS).cloned().unwrap_or_default(),
        mode: options.get(flex::MODE).cloned().unwrap_or_default(),
        remote_path,
        volume_name: name,
    })
}

/// Whether a volume is released, set to be deleted, and ours
pub fn should_reclaim(volume: &PersistentVolume, provisioner_name: &str) -> bool {
    let released = volume
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        == Some("Released");
    let delete_policy = volume
        .spec
        .as_ref()
        .and_then(|s| s.persistent_volume_reclaim_policy.as_deref())
        == Some(DEFAULT_RECLAIM_POLICY);
    let ours = volume
        .annotations()
        .get(ANN_PROVISIONED_BY)
        .map(String::as_str)
        == Some(provisioner_name);

    released && delete_policy && ours
}
