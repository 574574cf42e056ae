//! Kubernetes Controller
//!
//! Drives the provisioner from the cluster: unbound claims are provisioned,
//! released volumes are reclaimed.

pub mod claims;
pub mod resources;
pub mod volumes;

pub use claims::reconcile_claim;
pub use resources::*;
pub use volumes::reconcile_volume;

use crate::error::{Error, ErrorAction, Result};
use crate::provisioner::NasProvisioner;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use kube::api::Api;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Client, Resource, ResourceExt};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay used for errors that should be retried soon
const BACKOFF_REQUEUE: Duration = Duration::from_secs(15);

// =============================================================================
// Metrics
// =============================================================================

/// Counters exported on the metrics endpoint
#[derive(Clone)]
pub struct ControllerMetrics {
    pub provisions: IntCounter,
    pub deletions: IntCounter,
    pub failures: IntCounterVec,
}

impl ControllerMetrics {
    /// Create the counters and register them with `registry`
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self::unregistered()?;
        for collector in [
            Box::new(metrics.provisions.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(metrics.deletions.clone()),
            Box::new(metrics.failures.clone()),
        ] {
            registry
                .register(collector)
                .map_err(|e| Error::Internal(format!("Metric registration failed: {}", e)))?;
        }
        Ok(metrics)
    }

    /// Create the counters without registering them
    pub fn unregistered() -> Result<Self> {
        let metric_err = |e: prometheus::Error| Error::Internal(format!("Invalid metric: {}", e));

        Ok(Self {
            provisions: IntCounter::new(
                "nas_provisioner_provisions_total",
                "Total number of volumes provisioned",
            )
            .map_err(metric_err)?,
            deletions: IntCounter::new(
                "nas_provisioner_deletions_total",
                "Total number of volumes reclaimed",
            )
            .map_err(metric_err)?,
            failures: IntCounterVec::new(
                Opts::new(
                    "nas_provisioner_failures_total",
                    "Failed provision/delete operations",
                ),
                &["operation"],
            )
            .map_err(metric_err)?,
        })
    }
}

// =============================================================================
// Controller Context
// =============================================================================

/// Shared state for reconcilers
pub struct Context {
    pub client: Client,
    pub provisioner: Arc<NasProvisioner>,
    /// Identity matched against `StorageClass.provisioner`
    pub provisioner_name: String,
    pub metrics: ControllerMetrics,
}

impl Context {
    pub fn new(
        client: Client,
        provisioner: Arc<NasProvisioner>,
        provisioner_name: impl Into<String>,
        metrics: ControllerMetrics,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            provisioner,
            provisioner_name: provisioner_name.into(),
            metrics,
        })
    }
}

// =============================================================================
// Error Policy
// =============================================================================

/// Requeue action for a reconcile error
pub fn requeue_action(error: &Error) -> Action {
    match error.action() {
        ErrorAction::RequeueWithBackoff => Action::requeue(BACKOFF_REQUEUE),
        ErrorAction::RequeueAfter(delay) => Action::requeue(delay),
        ErrorAction::NoRequeue => Action::await_change(),
    }
}

/// Error policy shared by both controllers
pub fn error_policy<K>(object: Arc<K>, error: &Error, _ctx: Arc<Context>) -> Action
where
    K: Resource,
{
    warn!("Reconcile of {} failed: {}", object.name_any(), error);
    requeue_action(error)
}

// =============================================================================
// Run
// =============================================================================

/// Run the claim and volume controllers until shutdown
pub async fn run(ctx: Arc<Context>) {
    info!("Starting controllers for provisioner {}", ctx.provisioner_name);

    let claims: Api<PersistentVolumeClaim> = Api::all(ctx.client.clone());
    let volumes: Api<PersistentVolume> = Api::all(ctx.client.clone());

    let claim_controller = Controller::new(claims, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile_claim, error_policy::<PersistentVolumeClaim>, ctx.clone())
        .for_each(|result| async move {
            match result {
                Ok((claim, _)) => debug!("Reconciled claim {}", claim.name),
                Err(e) => warn!("Claim controller error: {}", e),
            }
        });

    let volume_controller = Controller::new(volumes, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile_volume, error_policy::<PersistentVolume>, ctx)
        .for_each(|result| async move {
            match result {
                Ok((volume, _)) => debug!("Reconciled volume {}", volume.name),
                Err(e) => warn!("Volume controller error: {}", e),
            }
        });

    futures::join!(claim_controller, volume_controller);
    info!("Controllers stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_action() {
        let err = Error::MountFailure {
            server: "10.0.0.1".into(),
            path: "/export".into(),
            reason: "timed out".into(),
        };
        assert_eq!(requeue_action(&err), Action::requeue(BACKOFF_REQUEUE));

        let err = Error::Configuration("no servers".into());
        assert_eq!(requeue_action(&err), Action::requeue(Duration::from_secs(300)));

        let err = Error::UnsupportedRequest("selector".into());
        assert_eq!(requeue_action(&err), Action::await_change());
    }

    #[test]
    fn test_metrics_registration() {
        let registry = Registry::new();
        let metrics = ControllerMetrics::new(&registry).unwrap();

        metrics.provisions.inc();
        metrics.failures.with_label_values(&["delete"]).inc();

        let names: Vec<_> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"nas_provisioner_provisions_total".to_string()));
        assert!(names.contains(&"nas_provisioner_failures_total".to_string()));

        // A second registration of the same names is rejected
        assert!(ControllerMetrics::new(&registry).is_err());
    }
}
