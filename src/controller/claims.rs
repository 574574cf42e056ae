//! Claim Controller
//!
//! Provisions a PersistentVolume for every unbound claim whose storage class
//! names this provisioner.

use super::resources::{
    build_persistent_volume, claim_class_name, claim_needs_volume, provision_request,
    storage_class_ref, volume_name_for_claim,
};
use super::Context;
use crate::error::Result;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, PostParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Reconcile one claim
pub async fn reconcile_claim(claim: Arc<PersistentVolumeClaim>, ctx: Arc<Context>) -> Result<Action> {
    if !claim_needs_volume(&claim) {
        return Ok(Action::await_change());
    }

    let Some(class_name) = claim_class_name(&claim) else {
        return Ok(Action::await_change());
    };

    let classes: Api<StorageClass> = Api::all(ctx.client.clone());
    let Some(class) = classes.get_opt(&class_name).await? else {
        debug!(
            "Storage class {} for claim {}/{} not found yet",
            class_name,
            claim.namespace().unwrap_or_default(),
            claim.name_any()
        );
        return Ok(Action::requeue(Duration::from_secs(60)));
    };
    if class.provisioner != ctx.provisioner_name {
        return Ok(Action::await_change());
    }

    let volume_name = volume_name_for_claim(&claim)?;
    let volumes: Api<PersistentVolume> = Api::all(ctx.client.clone());
    if volumes.get_opt(&volume_name).await?.is_some() {
        debug!("Volume {} already exists, waiting for binding", volume_name);
        return Ok(Action::await_change());
    }

    let request = provision_request(&claim, storage_class_ref(&class), volume_name);
    let response = ctx.provisioner.provision(&request).inspect_err(|_| {
        ctx.metrics.failures.with_label_values(&["provision"]).inc();
    })?;

    let volume = build_persistent_volume(
        &claim,
        &response,
        &ctx.provisioner_name,
        &ctx.provisioner.config().driver_name,
    );
    volumes.create(&PostParams::default(), &volume).await?;
    ctx.metrics.provisions.inc();

    info!(
        "Created volume {} for claim {}/{} on {}",
        response.descriptor.volume_name,
        request.namespace,
        request.claim_name,
        response.descriptor.server
    );

    Ok(Action::await_change())
}
