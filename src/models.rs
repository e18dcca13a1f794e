//! Core data model: hosts, resource descriptions and dump objects.
//!
//! A [`DumpObject`] is one unit of collection work, produced by expanding the
//! configuration's role tree (one object per role x host x declared resource).
//! The [`Resource`] enum is the closed set of object kinds the driver registry
//! dispatches on.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_USERNAME;

/// Where a dump object should be collected from.
///
/// A descriptor with neither `hostname` nor `address` means the local host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub hostname: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "ssh-key")]
    pub ssh_key: Option<PathBuf>,
    pub username: Option<String>,
}

impl Host {
    /// The implicit local host used when a role declares no hosts.
    pub fn local() -> Self {
        Self::default()
    }

    /// Address used for dial-out and per-pass circuit breaking. An IP address
    /// is preferable for network connection.
    pub fn network_address(&self) -> Option<&str> {
        self.address.as_deref().or(self.hostname.as_deref())
    }

    /// Name used for the target tree and log lines. A hostname is more
    /// readable than an address; objects without either run on the local
    /// host, so its hostname is used.
    pub fn report_name(&self) -> String {
        self.hostname
            .clone()
            .or_else(|| self.address.clone())
            .unwrap_or_else(local_hostname)
    }

    pub fn is_local(&self) -> bool {
        self.network_address().is_none()
    }

    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(DEFAULT_USERNAME)
    }
}

/// Hostname of the machine running the collection.
pub fn local_hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

/// A field that accepts either a single value or a list in the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    pub fn to_vec(&self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value.clone()],
            OneOrMany::Many(values) => values.clone(),
        }
    }
}

/// A file or directory path to fetch, with optional shell-glob exclusions
/// deleted from the fetched tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// A database to dump with `pg_dump` on the object's host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostgresSpec {
    #[serde(default = "default_dbhost")]
    pub dbhost: String,
    pub dbname: String,
    #[serde(default = "default_db_username")]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_dbhost() -> String {
    "localhost".to_string()
}

fn default_db_username() -> String {
    "postgres".to_string()
}

/// A set of methods to probe on an XML-RPC endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlRpcSpec {
    #[serde(default = "default_xmlrpc_server")]
    pub server: String,
    #[serde(default)]
    pub methods: Vec<String>,
    pub to_file: String,
}

fn default_xmlrpc_server() -> String {
    "http://localhost".to_string()
}

/// One or more shell commands whose output is captured into a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub command: OneOrMany<String>,
    pub to_file: String,
}

/// Like [`CommandSpec`], but every command runs inside each named container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerCommandSpec {
    pub container: OneOrMany<String>,
    pub command: OneOrMany<String>,
    pub to_file: String,
}

/// The closed set of object kinds the driver registry dispatches on.
///
/// Unknown `type:` tags deserialize to [`Resource::Unsupported`] so that one
/// bad object surfaces as an `UnsupportedKind` dispatch error instead of
/// failing the whole config load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resource {
    File(FileSpec),
    Dir(FileSpec),
    Postgres(PostgresSpec),
    Xmlrpc(XmlRpcSpec),
    Command(CommandSpec),
    ContainerCommand(ContainerCommandSpec),
    #[serde(other)]
    Unsupported,
}

impl Resource {
    /// The kind tag, for log lines and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::File(_) => "file",
            Resource::Dir(_) => "dir",
            Resource::Postgres(_) => "postgres",
            Resource::Xmlrpc(_) => "xmlrpc",
            Resource::Command(_) => "command",
            Resource::ContainerCommand(_) => "container_command",
            Resource::Unsupported => "unsupported",
        }
    }
}

/// Retry state of a dump object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectStatus {
    /// Still eligible for dispatch through its own driver.
    Pending,
    /// Exhausted all retry passes; dispatched exactly once more through the
    /// offline-marker driver and then dropped.
    Offline,
}

/// One unit of collection work bound to a host and a resource description.
#[derive(Debug, Clone)]
pub struct DumpObject {
    pub resource: Resource,
    pub host: Host,
    /// Per-object command timeout override, in seconds.
    pub timeout: Option<u64>,
    pub attempts_remaining: u32,
    pub status: ObjectStatus,
}

impl DumpObject {
    pub fn new(resource: Resource, host: Host, attempts: u32) -> Self {
        Self {
            resource,
            host,
            timeout: None,
            attempts_remaining: attempts,
            status: ObjectStatus::Pending,
        }
    }

    pub fn network_address(&self) -> Option<&str> {
        self.host.network_address()
    }
}

/// Captured result of one command execution.
///
/// A `return_code` of `None` means the command never completed (the transport
/// failed after the session was up); the failure text lands in `stderr`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOut {
    pub return_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// One report row: the host, the probe that produced it, one line of output.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub host: String,
    pub descriptor: String,
    pub output: String,
}
