//! YAML configuration model and run context.
//!
//! The config is a declarative tree keyed by role: each role carries a list
//! of host descriptors and a list of object descriptors. The work queue
//! expands it into dump objects; everything else here are the per-run knobs
//! (target path, compression level, retry budget, pointer and log files).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ATTEMPTS, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_COMPRESSION_LEVEL,
    DEFAULT_CONTAINER_EXEC, DEFAULT_LASTDUMP, DEFAULT_LOG_FILE, DEFAULT_TARGET, DEFAULT_TIMESTAMP,
};
use crate::error::{DumpError, Result};
use crate::models::{DumpObject, FileSpec, Host, Resource};

/// One object descriptor inside a role, with its optional timeout override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Hosts assigned to a role and the objects to collect from each of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub hosts: Option<Vec<Host>>,
    #[serde(default)]
    pub objects: Vec<ObjectEntry>,
}

impl RoleConfig {
    /// Hosts to expand against; a role without hosts means the local host.
    pub fn effective_hosts(&self) -> Vec<Host> {
        match &self.hosts {
            Some(hosts) if !hosts.is_empty() => hosts.clone(),
            _ => vec![Host::local()],
        }
    }
}

/// Full snapshot/report configuration for one run.
///
/// Roles are kept in a `BTreeMap` so expansion order is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfig {
    #[serde(default)]
    pub dump: BTreeMap<String, RoleConfig>,

    #[serde(default = "default_target")]
    pub target: String,

    /// Append a run timestamp to the target path.
    #[serde(default = "default_timestamp")]
    pub timestamp: bool,

    #[serde(default)]
    pub compression_level: Option<u8>,

    /// Default per-command timeout, in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Retry passes over the queue before objects are demoted to offline.
    #[serde(default)]
    pub attempts: Option<u32>,

    #[serde(default = "default_lastdump")]
    pub lastdump: PathBuf,

    /// Stable path to symlink at the timestamped archive after a successful
    /// run, without the `.tar.xz` suffix.
    #[serde(default)]
    pub target_symlink: Option<String>,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Keep the uncompressed dump tree after archiving.
    #[serde(default)]
    pub keep_target: bool,

    /// Prefix used to wrap commands of `container_command` objects.
    #[serde(default = "default_container_exec")]
    pub container_exec: String,

    /// Target path with the run timestamp applied, computed once at load so
    /// every component sees the same tree.
    #[serde(skip)]
    resolved_target: PathBuf,
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

fn default_timestamp() -> bool {
    DEFAULT_TIMESTAMP
}

fn default_lastdump() -> PathBuf {
    PathBuf::from(DEFAULT_LASTDUMP)
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_container_exec() -> String {
    DEFAULT_CONTAINER_EXEC.to_string()
}

impl Default for DumpConfig {
    fn default() -> Self {
        let mut config = Self {
            dump: BTreeMap::new(),
            target: default_target(),
            timestamp: default_timestamp(),
            compression_level: None,
            timeout: None,
            attempts: None,
            lastdump: default_lastdump(),
            target_symlink: None,
            log_file: default_log_file(),
            keep_target: false,
            container_exec: default_container_exec(),
            resolved_target: PathBuf::new(),
        };
        config.resolve_target();
        config
    }
}

impl DumpConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            DumpError::Config(format!("failed to read {}: {}", path.display(), err))
        })?;
        let config = Self::from_yaml_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: DumpConfig = serde_yaml::from_str(content)
            .map_err(|err| DumpError::Config(format!("failed to parse config: {}", err)))?;
        config.resolve_target();
        Ok(config)
    }

    fn resolve_target(&mut self) {
        self.resolved_target = if self.timestamp {
            let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
            PathBuf::from(format!("{}-{}", self.target, stamp))
        } else {
            PathBuf::from(&self.target)
        };
    }

    /// Root of the dump tree for this run.
    pub fn target(&self) -> &Path {
        &self.resolved_target
    }

    /// xz compression level, clamped to the valid 0..=9 range.
    pub fn compression_level(&self) -> u8 {
        self.compression_level
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL)
            .min(9)
    }

    /// Default per-command timeout, in seconds.
    pub fn timeout(&self) -> u64 {
        self.timeout.unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS)
    }

    /// Retry passes over the queue before objects are demoted to offline.
    pub fn attempts(&self) -> u32 {
        self.attempts.unwrap_or(DEFAULT_ATTEMPTS)
    }

    /// The run's own log as a dump object. The manager dispatches it last so
    /// the collected log reflects the whole run.
    pub fn self_log_object(&self) -> DumpObject {
        DumpObject::new(
            Resource::File(FileSpec {
                path: self.log_file.to_string_lossy().into_owned(),
                exclude: Vec::new(),
            }),
            Host::local(),
            self.attempts(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObjectStatus;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
dump:
  controller:
    hosts:
      - hostname: node-1.domain.tld
        address: 10.0.0.2
        ssh-key: /root/.ssh/id_rsa
    objects:
      - type: dir
        path: /var/log
        exclude:
          - '*.gz'
      - type: command
        command: df -h
        to_file: df.txt
  master:
    objects:
      - type: postgres
        dbname: nova
target: /tmp/snapshot/fleet
timestamp: false
compression_level: 5
timeout: 120
attempts: 3
lastdump: /tmp/snapshot/lastdump
log_file: /tmp/snapshot/run.log
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = DumpConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.dump.len(), 2);
        assert_eq!(config.target(), Path::new("/tmp/snapshot/fleet"));
        assert_eq!(config.compression_level(), 5);
        assert_eq!(config.timeout(), 120);
        assert_eq!(config.attempts(), 3);

        let controller = &config.dump["controller"];
        let hosts = controller.effective_hosts();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].network_address(), Some("10.0.0.2"));
        assert_eq!(
            hosts[0].ssh_key,
            Some(PathBuf::from("/root/.ssh/id_rsa"))
        );
        assert_eq!(controller.objects.len(), 2);
    }

    #[test]
    fn test_role_without_hosts_runs_locally() {
        let config = DumpConfig::from_yaml_str(SAMPLE).unwrap();
        let hosts = config.dump["master"].effective_hosts();
        assert_eq!(hosts.len(), 1);
        assert!(hosts[0].is_local());
    }

    #[test]
    fn test_defaults_applied() {
        let config = DumpConfig::from_yaml_str("dump: {}\n").unwrap();
        assert_eq!(config.compression_level(), DEFAULT_COMPRESSION_LEVEL);
        assert_eq!(config.timeout(), DEFAULT_COMMAND_TIMEOUT_SECS);
        assert_eq!(config.attempts(), DEFAULT_ATTEMPTS);
        assert_eq!(config.lastdump, PathBuf::from(DEFAULT_LASTDUMP));
        assert!(!config.keep_target);
    }

    #[test]
    fn test_timestamped_target() {
        let config = DumpConfig::from_yaml_str("target: /tmp/snap/dump\n").unwrap();
        let target = config.target().to_string_lossy().into_owned();
        assert!(target.starts_with("/tmp/snap/dump-"));
        assert!(target.len() > "/tmp/snap/dump-".len());
    }

    #[test]
    fn test_compression_level_clamped() {
        let config = DumpConfig::from_yaml_str("compression_level: 42\n").unwrap();
        assert_eq!(config.compression_level(), 9);
    }

    #[test]
    fn test_self_log_object() {
        let config = DumpConfig::from_yaml_str(SAMPLE).unwrap();
        let object = config.self_log_object();
        assert!(object.host.is_local());
        assert_eq!(object.status, ObjectStatus::Pending);
        match &object.resource {
            Resource::File(spec) => assert_eq!(spec.path, "/tmp/snapshot/run.log"),
            other => panic!("expected file resource, got {:?}", other),
        }
    }

    #[test]
    fn test_object_timeout_override() {
        let yaml = r#"
dump:
  role:
    objects:
      - type: command
        command: slow-probe
        to_file: probe.txt
        timeout: 900
"#;
        let config = DumpConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.dump["role"].objects[0].timeout, Some(900));
    }

    #[test]
    fn test_from_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, SAMPLE).unwrap();

        let config = DumpConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.dump.len(), 2);
    }

    #[test]
    fn test_invalid_yaml_error() {
        let result = DumpConfig::from_yaml_str("dump: [not, a, map]\n");
        assert!(matches!(result, Err(DumpError::Config(_))));
    }

    #[test]
    fn test_missing_file_error() {
        let result = DumpConfig::from_yaml_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(DumpError::Config(_))));
    }
}
