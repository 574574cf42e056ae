//! Path Planning
//!
//! Pure functions computing remote export paths and local mount points.

use super::pool::clean_path;
use std::path::{Path, PathBuf};

/// Prefix of an archived volume directory
pub const ARCHIVE_PREFIX: &str = "archived-";

/// Name of the per-volume directory on the export
pub fn volume_directory_name(namespace: &str, claim_name: &str, volume_name: &str) -> String {
    [namespace, claim_name, volume_name].join("-")
}

/// Export path of a volume directory on a server's export
pub fn remote_export_path(export_path: &str, directory_name: &str) -> String {
    clean_path(&format!("{}/{}", export_path, directory_name))
}

/// Export root a volume path was created under
///
/// Strips one trailing `/`, then everything from the last `/` on. An empty
/// result is the root.
pub fn parent_export_path(full_path: &str) -> String {
    let trimmed = full_path.strip_suffix('/').unwrap_or(full_path);
    match trimmed.rfind('/') {
        Some(pos) if pos > 0 => trimmed[..pos].to_string(),
        _ => "/".to_string(),
    }
}

/// Last element of a volume path, ignoring trailing slashes
pub fn base_name(full_path: &str) -> &str {
    let trimmed = full_path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

/// Local mount point for a (storage class, server, export) triple
///
/// Dots in the class key and server address become underscores so that each
/// pair gets its own directory under `root`.
pub fn normalized_local_mount_path(
    root: &Path,
    class_key: &str,
    server_address: &str,
    remote_path: &str,
) -> PathBuf {
    let class_key = class_key.replace('.', "_");
    let server = server_address.replace('.', "_");

    let mut path = root.to_path_buf();
    for component in [class_key.as_str(), server.as_str()] {
        path.push(component.trim_matches('/'));
    }
    let relative = clean_path(remote_path);
    let relative = relative.trim_start_matches('/');
    if !relative.is_empty() {
        path.push(relative);
    }
    path
}

/// Name the directory is renamed to when archived
pub fn archived_directory_name(directory_name: &str) -> String {
    format!("{}{}", ARCHIVE_PREFIX, directory_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_directory_name() {
        assert_eq!(volume_directory_name("ns", "pvc1", "pv-x"), "ns-pvc1-pv-x");
    }

    #[test]
    fn test_remote_export_path() {
        assert_eq!(remote_export_path("/export", "ns-pvc1-pv-x"), "/export/ns-pvc1-pv-x");
        assert_eq!(remote_export_path("/", "dir"), "/dir");
        assert_eq!(remote_export_path("/export/", "dir"), "/export/dir");
    }

    #[test]
    fn test_parent_export_path() {
        assert_eq!(parent_export_path("/a/b/c"), "/a/b");
        assert_eq!(parent_export_path("/a/b/c/"), "/a/b");
        assert_eq!(parent_export_path("/a"), "/");
        assert_eq!(parent_export_path("/a/"), "/");
    }

    #[test]
    fn test_parent_inverts_remote_path() {
        let remote = remote_export_path("/data/exports", "ns-claim-pv-1");
        assert_eq!(parent_export_path(&remote), "/data/exports");
        assert_eq!(base_name(&remote), "ns-claim-pv-1");
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("/a/b/c"), "c");
        assert_eq!(base_name("/a/b/c/"), "c");
        assert_eq!(base_name("c"), "c");
    }

    #[test]
    fn test_normalized_local_mount_path() {
        let path = normalized_local_mount_path(
            Path::new("/persistentvolumes"),
            "nas.gold",
            "10.0.0.1",
            "/export/vols",
        );
        assert_eq!(
            path,
            PathBuf::from("/persistentvolumes/nas_gold/10_0_0_1/export/vols")
        );

        let root = normalized_local_mount_path(Path::new("/mnt"), "gold", "nas-1", "/");
        assert_eq!(root, PathBuf::from("/mnt/gold/nas-1"));
    }

    #[test]
    fn test_mount_paths_distinct_per_class_and_server() {
        let root = Path::new("/persistentvolumes");
        let a = normalized_local_mount_path(root, "gold", "10.0.0.1", "/export");
        let b = normalized_local_mount_path(root, "silver", "10.0.0.1", "/export");
        let c = normalized_local_mount_path(root, "gold", "10.0.0.2", "/export");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_archived_directory_name() {
        assert_eq!(archived_directory_name("ns-pvc1-pv-x"), "archived-ns-pvc1-pv-x");
    }
}
