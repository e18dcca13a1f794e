//! Driver for `file` and `dir` objects.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::DumpConfig;
use crate::drivers::Driver;
use crate::error::Result;
use crate::models::{DumpObject, FileSpec};
use crate::transport::Transport;

/// Fetches a path from the object's host into the target tree, preserving
/// the original directory layout, then deletes excluded sub-paths from the
/// fetched copy.
///
/// With `target = /target`, `host = node-1` and `path = /var/log`, the
/// fetched tree lands at `/target/node-1/var/log`.
pub struct FileDriver {
    host: String,
    path: String,
    exclude: Vec<String>,
    /// Directory the fetch lands in: `target/<host>/<dirname(path)>`.
    target_path: PathBuf,
    /// The fetched copy itself: `target/<host>/<path>`.
    full_dst_path: PathBuf,
}

impl FileDriver {
    pub fn new(object: &DumpObject, spec: FileSpec, config: &DumpConfig) -> Self {
        let host = object.host.report_name();
        let host_root = config.target().join(&host);
        let trimmed = spec.path.trim_start_matches('/');
        let parent = Path::new(trimmed).parent().unwrap_or_else(|| Path::new(""));
        Self {
            target_path: host_root.join(parent),
            full_dst_path: host_root.join(trimmed),
            host,
            path: spec.path,
            exclude: spec.exclude,
        }
    }
}

impl Driver for FileDriver {
    fn snapshot(&self, transport: &dyn Transport) -> Result<()> {
        debug!("File to get: {} from {}", self.path, self.host);
        match transport.fetch(Path::new(&self.path), &self.target_path) {
            Ok(()) => {}
            Err(err) if err.is_network() => return Err(err),
            Err(err) => {
                // Best-effort: a missing or unreadable path is noted and
                // skipped, the rest of the run continues.
                warn!("Failed to fetch {} from {}: {}", self.path, self.host, err);
                return Ok(());
            }
        }
        if !self.exclude.is_empty() {
            remove_matching(&self.full_dst_path, &self.exclude);
        }
        Ok(())
    }
}

/// Deletes sub-paths matching shell-glob patterns, rooted at `root`.
fn remove_matching(root: &Path, patterns: &[String]) {
    for pattern in patterns {
        let full = root.join(pattern.trim_start_matches('/'));
        let full = match full.to_str() {
            Some(full) => full.to_owned(),
            None => {
                warn!("Skipping non-UTF-8 exclude path under {}", root.display());
                continue;
            }
        };
        let entries = match glob::glob(&full) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Invalid exclude pattern {}: {}", pattern, err);
                continue;
            }
        };
        for entry in entries.flatten() {
            debug!("Deleting {}", entry.display());
            let removed = if entry.is_dir() {
                fs::remove_dir_all(&entry)
            } else {
                fs::remove_file(&entry)
            };
            if let Err(err) = removed {
                warn!("Failed to delete {}: {}", entry.display(), err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DumpConfig;
    use crate::models::{Host, Resource};
    use crate::transport::LocalTransport;
    use tempfile::TempDir;

    fn local_config(target: &Path) -> DumpConfig {
        DumpConfig::from_yaml_str(&format!(
            "target: {}\ntimestamp: false\n",
            target.display()
        ))
        .unwrap()
    }

    fn file_object(spec: &FileSpec) -> DumpObject {
        DumpObject::new(Resource::File(spec.clone()), Host::local(), 2)
    }

    #[test]
    fn test_snapshot_preserves_directory_layout() {
        let source = TempDir::new().unwrap();
        let workdir = TempDir::new().unwrap();
        let target = workdir.path().join("dump");

        let logs = source.path().join("log");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("messages"), "hello\n").unwrap();

        let spec = FileSpec {
            path: logs.to_string_lossy().into_owned(),
            exclude: Vec::new(),
        };
        let config = local_config(&target);
        let object = file_object(&spec);
        let driver = FileDriver::new(&object, spec, &config);
        driver.snapshot(&LocalTransport).unwrap();

        let host = object.host.report_name();
        let fetched = target
            .join(host)
            .join(logs.to_string_lossy().trim_start_matches('/'))
            .join("messages");
        assert_eq!(fs::read_to_string(fetched).unwrap(), "hello\n");
    }

    #[test]
    fn test_snapshot_deletes_excluded_globs() {
        let source = TempDir::new().unwrap();
        let workdir = TempDir::new().unwrap();
        let target = workdir.path().join("dump");

        let logs = source.path().join("log");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("messages"), "keep\n").unwrap();
        fs::write(logs.join("old.gz"), "drop\n").unwrap();
        fs::write(logs.join("older.gz"), "drop\n").unwrap();

        let spec = FileSpec {
            path: logs.to_string_lossy().into_owned(),
            exclude: vec!["*.gz".to_string()],
        };
        let config = local_config(&target);
        let object = file_object(&spec);
        let driver = FileDriver::new(&object, spec, &config);
        driver.snapshot(&LocalTransport).unwrap();

        let fetched = target
            .join(object.host.report_name())
            .join(logs.to_string_lossy().trim_start_matches('/'));
        assert!(fetched.join("messages").exists());
        assert!(!fetched.join("old.gz").exists());
        assert!(!fetched.join("older.gz").exists());
    }

    #[test]
    fn test_missing_source_is_absorbed() {
        let workdir = TempDir::new().unwrap();
        let target = workdir.path().join("dump");
        let spec = FileSpec {
            path: "/nonexistent/path".to_string(),
            exclude: Vec::new(),
        };
        let config = local_config(&target);
        let object = file_object(&spec);
        let driver = FileDriver::new(&object, spec, &config);
        // A missing path must not abort the run.
        assert!(driver.snapshot(&LocalTransport).is_ok());
    }
}
