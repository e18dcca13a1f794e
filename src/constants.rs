//! Default settings for a collection run.
//!
//! Every value here can be overridden from the YAML configuration; these are
//! the fallbacks used when the config stays silent.

/// Default dump tree location when the config does not name a target.
pub const DEFAULT_TARGET: &str = "/tmp/fleetsnap/dump";

/// Default pointer file recording the most recent archive path.
pub const DEFAULT_LASTDUMP: &str = "/tmp/fleetsnap/lastdump";

/// Default run log; this is what the self-log object collects at the end of
/// a snapshot.
pub const DEFAULT_LOG_FILE: &str = "/var/log/fleetsnap.log";

/// Retry passes over the queue before pending objects are demoted to offline.
pub const DEFAULT_ATTEMPTS: u32 = 2;

/// xz compression level passed to the archiver via `XZ_OPT`.
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 3;

/// Ceiling for a single remote command, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// TCP connect ceiling for session establishment, in seconds. Kept short so
/// a dead host does not stall a whole pass.
pub const CONNECT_TIMEOUT_SECS: u64 = 2;

/// Default SSH port
pub const SSH_DEFAULT_PORT: u16 = 22;

/// Login used when a host descriptor does not name one.
pub const DEFAULT_USERNAME: &str = "root";

/// Prefix used to wrap commands of `container_command` objects.
pub const DEFAULT_CONTAINER_EXEC: &str = "docker exec";

/// Marker file written under `target/<host>/` for hosts that stayed
/// unreachable for the whole run.
pub const OFFLINE_MARKER_FILE: &str = "OFFLINE_NODE.txt";

/// Append a timestamp to the target path by default.
pub const DEFAULT_TIMESTAMP: bool = true;

/// Port recorded in `.pgpass` entries.
pub const POSTGRES_PORT: &str = "5432";
