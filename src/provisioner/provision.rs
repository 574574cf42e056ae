//! Provision: pick a server and plan the volume directory

use super::NasProvisioner;
use crate::domain::ports::{
    params, NfsVersion, ProvisionRequest, ProvisionResponse, ServerRecord, StorageClassRef,
    VolumeDescriptor,
};
use crate::error::{Error, Result};
use crate::nfs::{parse_servers, remote_export_path, volume_directory_name, SelectionStrategy};
use tracing::{debug, info};

const NO_SERVERS: &str = "at least one valid server must be provided";

impl NasProvisioner {
    /// Plan a volume for a claim
    ///
    /// Validates the request, selects a server, and returns the descriptor.
    /// The export itself is not touched.
    pub fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionResponse> {
        if request.selector_requested {
            return Err(Error::UnsupportedRequest(
                "claim Selector is not supported".into(),
            ));
        }

        let class = &request.storage_class;
        info!(
            "NAS provisioner v{}: provisioning {} for claim {}/{} (class {})",
            crate::VERSION,
            request.volume_name,
            request.namespace,
            request.claim_name,
            class.name
        );

        let pool = self.server_pool(class);
        if pool.is_empty() {
            return Err(Error::Configuration(NO_SERVERS.into()));
        }

        let strategy = SelectionStrategy::from_parameter(class.parameter(params::STRATEGY));
        let server = self
            .selector
            .select_or_first(&pool, &class.name, strategy)
            .cloned()
            .ok_or_else(|| Error::Configuration(NO_SERVERS.into()))?;
        debug!(
            "Selected {} out of {} servers ({})",
            server,
            pool.len(),
            strategy
        );

        let version = NfsVersion::resolve(class.parameter(params::VERSION));
        let mount_options = class
            .parameter(params::OPTIONS)
            .unwrap_or_else(|| self.config.default_options(version.family()))
            .to_string();

        let directory =
            volume_directory_name(&request.namespace, &request.claim_name, &request.volume_name);
        let remote_path = remote_export_path(&server.export_path, &directory);

        info!(
            "Volume {} planned at {}:{} (vers={})",
            request.volume_name, server.address, remote_path, version
        );

        Ok(ProvisionResponse {
            descriptor: VolumeDescriptor {
                volume_name: request.volume_name.clone(),
                server,
                remote_path,
                version,
                mount_options,
                mode: class.parameter(params::MODE).unwrap_or_default().to_string(),
            },
            storage_class_name: class.name.clone(),
            reclaim_policy: class.reclaim_policy.clone(),
            access_modes: request.access_modes.clone(),
            mount_options: class.mount_options.clone(),
            capacity: request.capacity.clone(),
        })
    }

    /// Candidate servers from `servers` plus a `server`/`path` pair
    fn server_pool(&self, class: &StorageClassRef) -> Vec<ServerRecord> {
        let mut entries: Vec<String> = class
            .parameter(params::SERVERS)
            .map(|list| list.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        if let Some(server) = class.parameter(params::SERVER) {
            let path = class.parameter(params::PATH).unwrap_or_default();
            entries.push(format!("{}/{}", server, path));
        }

        parse_servers(entries, &self.config.default_export_path)
    }
}
