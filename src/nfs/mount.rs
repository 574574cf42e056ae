//! Local Mounts
//!
//! Runs the host's `mount`/`umount` commands and wraps a mounted export in a
//! guard that unmounts it when dropped.

use crate::domain::ports::{CommandRunner, NfsVersion};
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info, warn};

// =============================================================================
// Shell Runner
// =============================================================================

/// [`CommandRunner`] backed by `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let command = render_command(program, args);
        debug!("Running: {}", command);

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command,
                reason: format!("{}; output: {}", output.status, combined.trim()),
            });
        }

        Ok(combined)
    }
}

/// Human-readable form of a command line, for logs and errors
pub fn render_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Mount Session
// =============================================================================

/// An NFS export mounted at a local path for the duration of one delete
///
/// Dropping the session unmounts it: a plain `umount` first, then
/// `umount -f`. Unmount failures are logged and otherwise ignored.
pub struct MountSession<'a> {
    runner: &'a dyn CommandRunner,
    mount_root: PathBuf,
    mounted: bool,
}

impl<'a> MountSession<'a> {
    /// Mount `server:export` at `mount_root`
    ///
    /// If the mount command fails but the mount table shows `mount_root` is
    /// already a mount point, the session proceeds as if the mount succeeded.
    pub fn mount(
        runner: &'a dyn CommandRunner,
        server: &str,
        export: &str,
        version: &NfsVersion,
        mount_root: PathBuf,
    ) -> Result<Self> {
        if let Err(e) = fs::create_dir_all(&mount_root) {
            error!("Unable to create mount directory {}: {}", mount_root.display(), e);
        }

        let local = mount_root.to_string_lossy().into_owned();
        let source = format!("{}:{}", server, export);
        let options = format!("vers={}", version);

        if let Err(mount_err) = runner.run("mount", &["-t", "nfs", "-o", &options, &source, &local]) {
            error!("Mount of {} at {} failed: {}", source, local, mount_err);

            if let Err(probe_err) = runner.run("mountpoint", &["-q", &local]) {
                error!("{} is not mounted after the failed mount: {}", local, probe_err);
                return Err(Error::MountFailure {
                    server: server.to_string(),
                    path: export.to_string(),
                    reason: mount_err.to_string(),
                });
            }

            warn!("{} is already mounted, skipping mount", local);
        }

        Ok(Self {
            runner,
            mount_root,
            mounted: true,
        })
    }

    /// Local path the export is mounted at
    pub fn path(&self) -> &Path {
        &self.mount_root
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn unmount(&mut self) {
        let local = self.mount_root.to_string_lossy().into_owned();

        if let Err(e) = self.runner.run("umount", &[&local]) {
            error!("Unmount of {} failed: {}", local, e);
            info!("Trying a forced unmount of {}", local);
            if let Err(e) = self.runner.run("umount", &["-f", &local]) {
                error!("Forced unmount of {} failed: {}", local, e);
            }
        }

        self.mounted = false;
    }
}

impl Drop for MountSession<'_> {
    fn drop(&mut self) {
        if self.mounted {
            self.unmount();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn version() -> NfsVersion {
        NfsVersion::resolve(None)
    }

    #[test]
    fn test_mount_then_unmount_on_drop() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("gold/10_0_0_1/export");
        let runner = RecordingRunner::new();

        {
            let session =
                MountSession::mount(&runner, "10.0.0.1", "/export", &version(), root.clone()).unwrap();
            assert!(session.is_mounted());
            assert!(session.path().is_dir());
        }

        let local = root.to_string_lossy();
        assert_eq!(
            runner.calls(),
            vec![
                format!("mount -t nfs -o vers=4.0 10.0.0.1:/export {}", local),
                format!("umount {}", local),
            ]
        );
    }

    #[test]
    fn test_mount_failure_already_mounted() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::failing(&["mount "]);

        let session =
            MountSession::mount(&runner, "10.0.0.1", "/export", &version(), dir.path().to_path_buf());
        assert!(session.is_ok());
        drop(session);

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].starts_with("mountpoint -q "));
        assert!(calls[2].starts_with("umount "));
    }

    #[test]
    fn test_mount_failure_not_mounted() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::failing(&["mount ", "mountpoint "]);

        let result =
            MountSession::mount(&runner, "10.0.0.1", "/export", &version(), dir.path().to_path_buf());
        let err = result.err().expect("mount should fail");
        assert_matches!(err, Error::MountFailure { ref server, .. } if server == "10.0.0.1");

        // Nothing was mounted, so nothing is unmounted
        assert!(runner.calls().iter().all(|c| !c.starts_with("umount")));
    }

    #[test]
    fn test_mount_directory_creation_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("occupied");
        fs::write(&root, b"regular file").unwrap();

        // The mount command still runs and decides the outcome
        let runner = RecordingRunner::new();
        let session =
            MountSession::mount(&runner, "10.0.0.1", "/export", &version(), root.clone()).unwrap();
        assert!(session.is_mounted());
        drop(session);
        let calls = runner.calls();
        assert!(calls[0].starts_with("mount -t nfs -o vers=4.0 10.0.0.1:/export "));
        assert!(calls[1].starts_with("umount "));

        let runner = RecordingRunner::failing(&["mount ", "mountpoint "]);
        let result = MountSession::mount(&runner, "10.0.0.1", "/export", &version(), root.clone());
        let err = result.err().expect("mount should fail");
        assert_matches!(err, Error::MountFailure { .. });
        assert_eq!(runner.calls().len(), 2);
        assert!(root.is_file());
    }

    #[test]
    fn test_forced_unmount_fallback() {
        let dir = TempDir::new().unwrap();
        let runner = RecordingRunner::failing(&["umount "]);

        let session =
            MountSession::mount(&runner, "10.0.0.1", "/export", &version(), dir.path().to_path_buf())
                .unwrap();
        drop(session);

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[2].starts_with("umount -f "));
    }

    #[test]
    fn test_render_command() {
        assert_eq!(render_command("umount", &["-f", "/mnt/x"]), "umount -f /mnt/x");
    }
}
