//! Delete: mount the export root, archive or remove the volume directory

use super::NasProvisioner;
use crate::domain::ports::{params, StorageClassRef, VolumeDescriptor};
use crate::error::{Error, Result};
use crate::nfs::{
    archived_directory_name, base_name, normalized_local_mount_path, parent_export_path,
    MountSession,
};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info, warn};

impl NasProvisioner {
    /// Reclaim the backing directory of a provisioned volume
    ///
    /// A volume whose directory is already gone is treated as deleted. The
    /// export is unmounted again on every path out of this function.
    pub fn delete(&self, descriptor: &VolumeDescriptor, class: &StorageClassRef) -> Result<()> {
        let remote_path = descriptor.remote_path.as_str();
        if remote_path.is_empty() || remote_path == "/" {
            error!(
                "Refusing to delete volume {}: path {:?} is an export root",
                descriptor.volume_name, remote_path
            );
            return Err(Error::UnsafePath {
                path: remote_path.to_string(),
            });
        }

        let directory = base_name(remote_path);
        if matches!(directory, "" | "." | "..") {
            return Err(Error::UnsafePath {
                path: remote_path.to_string(),
            });
        }

        let export = parent_export_path(remote_path);
        let server = &descriptor.server.address;
        let mount_root =
            normalized_local_mount_path(&self.config.mount_root, &class.name, server, &export);

        let session = MountSession::mount(
            self.runner.as_ref(),
            server,
            &export,
            &descriptor.version,
            mount_root,
        )?;

        let volume_dir = session.path().join(directory);
        match fs::symlink_metadata(&volume_dir) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Path {} does not exist, deletion skipped", volume_dir.display());
                return Ok(());
            }
            Err(e) => {
                error!("Unable to stat {}: {}", volume_dir.display(), e);
                return Err(deletion_failure(&volume_dir, e));
            }
        }

        if archive_on_delete(class)? {
            let archive_dir = session.path().join(archived_directory_name(directory));
            info!(
                "Archiving {} to {}",
                volume_dir.display(),
                archive_dir.display()
            );
            fs::rename(&volume_dir, &archive_dir).map_err(|e| deletion_failure(&volume_dir, e))
        } else {
            info!("Removing {}", volume_dir.display());
            fs::remove_dir_all(&volume_dir).map_err(|e| deletion_failure(&volume_dir, e))
        }
    }
}

/// Whether the class archives volume directories instead of removing them
pub fn archive_on_delete(class: &StorageClassRef) -> Result<bool> {
    match class.parameter(params::ARCHIVE_ON_DELETE) {
        None => Ok(true),
        Some(value) => parse_bool(value).ok_or_else(|| {
            Error::Configuration(format!(
                "invalid {} value {:?} in storage class {}",
                params::ARCHIVE_ON_DELETE,
                value,
                class.name
            ))
        }),
    }
}

/// Parse the boolean spellings accepted in storage class parameters
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn deletion_failure(path: &Path, e: std::io::Error) -> Error {
    Error::DeletionFailure {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
