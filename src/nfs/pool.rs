//! Server Pool
//!
//! Parses `address/path` configuration entries into validated server records.

use crate::domain::ports::ServerRecord;

/// Parse `address/path` entries into server records
///
/// Entries are trimmed and split on the first `/`. Entries without a `/` or
/// with an empty address are dropped. An empty path falls back to
/// `default_export_path`. Every path is cleaned and anchored at `/`.
pub fn parse_servers<I, S>(entries: I, default_export_path: &str) -> Vec<ServerRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|entry| {
            let (address, path) = entry.as_ref().trim().split_once('/')?;
            let address = address.trim();
            if address.is_empty() {
                return None;
            }

            let path = match path.trim() {
                "" => default_export_path,
                p => p,
            };

            Some(ServerRecord {
                address: address.to_string(),
                export_path: clean_path(path),
            })
        })
        .collect()
}

/// Lexically clean a path and anchor it at `/`
///
/// Empty and `.` segments are dropped, `..` removes the previous segment and
/// never climbs above the root.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: &str = "/nfsshare";

    fn record(address: &str, path: &str) -> ServerRecord {
        ServerRecord {
            address: address.into(),
            export_path: path.into(),
        }
    }

    #[test]
    fn test_parse_valid_entries() {
        let servers = parse_servers(
            ["10.0.0.1/export", " nas-2.local/data/vols ", "10.0.0.3/"],
            DEFAULT,
        );

        assert_eq!(
            servers,
            vec![
                record("10.0.0.1", "/export"),
                record("nas-2.local", "/data/vols"),
                record("10.0.0.3", DEFAULT),
            ]
        );
    }

    #[test]
    fn test_parse_drops_invalid_entries() {
        let servers = parse_servers(
            ["no-slash", "/missing-address", "", "   ", "10.0.0.9/ok"],
            DEFAULT,
        );

        assert_eq!(servers, vec![record("10.0.0.9", "/ok")]);
    }

    #[test]
    fn test_parse_anchors_path() {
        let servers = parse_servers(["10.0.0.1//export/", "10.0.0.2/a/./b/../c"], DEFAULT);

        assert_eq!(servers[0].export_path, "/export");
        assert_eq!(servers[1].export_path, "/a/c");
    }

    #[test]
    fn test_parse_empty_input() {
        let servers = parse_servers(Vec::<String>::new(), DEFAULT);
        assert!(servers.is_empty());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path(""), "/");
        assert_eq!(clean_path("export"), "/export");
        assert_eq!(clean_path("/a//b/"), "/a/b");
        assert_eq!(clean_path("../../etc"), "/etc");
    }
}
