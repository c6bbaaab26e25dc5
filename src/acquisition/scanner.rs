//! Track file discovery
//!
//! Walks an input directory (optionally recursively) and collects files with
//! the configured extension. Discovery order is sorted by path so repeated
//! runs dispatch in the same order; completion order is still unspecified.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Discovery options.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// File extension to match, without the dot, case-insensitive
    pub extension: String,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extension: "gpx".to_string(),
            recursive: true,
        }
    }
}

/// Collect matching files under `root`.
///
/// An unreadable `root` is an error. Unreadable subdirectories are logged and
/// skipped so one bad folder cannot hide the rest of the tree.
pub async fn scan_directory(root: &Path, options: &ScanOptions) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let mut is_root = true;

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if is_root => return Err(e),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Skipping unreadable directory");
                continue;
            }
        };
        let reading_root = std::mem::replace(&mut is_root, false);

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) if reading_root => return Err(e),
                Err(e) => {
                    warn!(path = %dir.display(), error = %e, "Stopped reading directory early");
                    break;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping entry with unknown type");
                    continue;
                }
            };

            if file_type.is_dir() {
                if options.recursive {
                    pending.push(path);
                }
            } else if has_extension(&path, &options.extension) {
                debug!(path = %path.display(), "Discovered track file");
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, b"").expect("write");
    }

    #[tokio::test]
    async fn finds_nested_files_case_insensitively() {
        let dir = tempfile::tempdir().expect("tmpdir");
        touch(&dir.path().join("a.gpx"));
        touch(&dir.path().join("nested/deeper/b.GPX"));
        touch(&dir.path().join("nested/notes.txt"));

        let found = scan_directory(dir.path(), &ScanOptions::default())
            .await
            .expect("scan");
        let names: Vec<_> = found
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.gpx", "b.GPX"]);
    }

    #[tokio::test]
    async fn non_recursive_stays_at_top_level() {
        let dir = tempfile::tempdir().expect("tmpdir");
        touch(&dir.path().join("a.gpx"));
        touch(&dir.path().join("sub/b.gpx"));

        let options = ScanOptions {
            recursive: false,
            ..ScanOptions::default()
        };
        let found = scan_directory(dir.path(), &options).await.expect("scan");
        assert_eq!(found.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tmpdir");
        touch(&dir.path().join("a.gpx"));
        touch(&dir.path().join("locked/b.gpx"));
        touch(&dir.path().join("open/c.gpx"));
        let locked = dir.path().join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).expect("chmod");

        let result = scan_directory(dir.path(), &ScanOptions::default()).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let found = result.expect("scan succeeds despite the locked folder");
        assert!(found.iter().any(|p| p.ends_with("a.gpx")));
        assert!(found.iter().any(|p| p.ends_with("open/c.gpx")));
        // Privileged users can still read the locked folder
        assert!(found.len() == 2 || found.len() == 3, "{found:?}");
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let result = scan_directory(Path::new("/no/such/dir/anywhere"), &ScanOptions::default()).await;
        assert!(result.is_err());
    }
}
