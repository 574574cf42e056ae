//! Volume Controller
//!
//! Reclaims the backing directory of released volumes this provisioner
//! created, then removes the PersistentVolume object.

use super::resources::{class_name_for_volume, descriptor_from_volume, should_reclaim, storage_class_ref};
use super::Context;
use crate::error::{Error, Result};
use k8s_openapi::api::core::v1::PersistentVolume;
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, DeleteParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, info};

/// Reconcile one volume
pub async fn reconcile_volume(volume: Arc<PersistentVolume>, ctx: Arc<Context>) -> Result<Action> {
    if !should_reclaim(&volume, &ctx.provisioner_name) {
        return Ok(Action::await_change());
    }

    let name = volume.name_any();
    let descriptor = descriptor_from_volume(&volume)?;
    let class_name = class_name_for_volume(&volume)?;

    let classes: Api<StorageClass> = Api::all(ctx.client.clone());
    let class = storage_class_ref(&classes.get(&class_name).await?);

    // Delete shells out and walks the export; keep it off the runtime threads
    let provisioner = ctx.provisioner.clone();
    tokio::task::spawn_blocking(move || provisioner.delete(&descriptor, &class))
        .await
        .map_err(|e| Error::Internal(format!("delete task for {} failed: {}", name, e)))?
        .inspect_err(|_| {
            ctx.metrics.failures.with_label_values(&["delete"]).inc();
        })?;

    let volumes: Api<PersistentVolume> = Api::all(ctx.client.clone());
    match volumes.delete(&name, &DeleteParams::default()).await {
        Ok(_) => {}
        Err(kube::Error::Api(response)) if response.code == 404 => {
            debug!("Volume {} already removed", name);
        }
        Err(e) => return Err(e.into()),
    }
    ctx.metrics.deletions.inc();

    info!("Reclaimed volume {}", name);
    Ok(Action::await_change())
}
