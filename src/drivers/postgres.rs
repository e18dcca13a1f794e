//! Driver for `postgres` objects.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::config::DumpConfig;
use crate::constants::POSTGRES_PORT;
use crate::drivers::Driver;
use crate::error::Result;
use crate::models::{DumpObject, PostgresSpec};
use crate::transport::Transport;

/// Dumps one database with `pg_dump` on the object's host and places the
/// result at `target/<host>/pg_dump/<dbhost>_<dbname>.sql`.
///
/// When a password is configured, a matching `~/.pgpass` entry is written
/// first (idempotently) so the dump can authenticate non-interactively.
pub struct PostgresDriver {
    host: String,
    dbhost: String,
    dbname: String,
    username: String,
    password: Option<String>,
    /// `target/<host>/pg_dump`.
    target_path: PathBuf,
}

impl PostgresDriver {
    pub fn new(object: &DumpObject, spec: PostgresSpec, config: &DumpConfig) -> Self {
        let host = object.host.report_name();
        let target_path = config.target().join(&host).join("pg_dump");
        Self {
            host,
            dbhost: spec.dbhost,
            dbname: spec.dbname,
            username: spec.username,
            password: spec.password,
            target_path,
        }
    }
}

impl Driver for PostgresDriver {
    fn snapshot(&self, transport: &dyn Transport) -> Result<()> {
        if let Some(password) = &self.password {
            if let Err(err) =
                ensure_pgpass_entry(&self.dbhost, &self.dbname, &self.username, password)
            {
                warn!("Failed to set up .pgpass for {}: {}", self.dbname, err);
            }
        }

        let temp = transport.run("mktemp")?;
        let temp_path = temp.stdout.trim().to_string();
        if temp_path.is_empty() {
            warn!(
                "mktemp produced no path on {}, skipping dump of {}",
                self.host, self.dbname
            );
            return Ok(());
        }

        let dump_command = format!(
            "pg_dump -h {} -U {} -w -f {} {}",
            self.dbhost, self.username, temp_path, self.dbname
        );
        debug!("Dumping database {} on {}", self.dbname, self.host);
        let out = transport.run(&dump_command)?;
        if out.return_code != Some(0) {
            warn!(
                "pg_dump of {} on {} exited with {:?}: {}",
                self.dbname,
                self.host,
                out.return_code,
                out.stderr.trim()
            );
        }

        fs::create_dir_all(&self.target_path)?;
        match transport.fetch(Path::new(&temp_path), &self.target_path) {
            Ok(()) => {
                let fetched = match Path::new(&temp_path).file_name() {
                    Some(name) => self.target_path.join(name),
                    None => self.target_path.clone(),
                };
                let dump_name = format!("{}_{}.sql", self.dbhost, self.dbname);
                fs::rename(fetched, self.target_path.join(dump_name))?;
            }
            Err(err) if err.is_network() => return Err(err),
            Err(err) => {
                warn!(
                    "Failed to fetch dump of {} from {}: {}",
                    self.dbname, self.host, err
                );
            }
        }

        // Temp file cleanup is best-effort; the dump itself already landed.
        if let Err(err) = transport.run(&format!("rm -f {}", temp_path)) {
            debug!("Failed to remove {} on {}: {}", temp_path, self.host, err);
        }
        Ok(())
    }
}

/// Appends a `host:port:db:user:password` line to `~/.pgpass` unless an
/// identical line is already present, and restricts the file to owner
/// read/write as libpq requires.
fn ensure_pgpass_entry(
    dbhost: &str,
    dbname: &str,
    username: &str,
    password: &str,
) -> io::Result<()> {
    let home = dirs::home_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))?;
    write_pgpass_entry(&home.join(".pgpass"), dbhost, dbname, username, password)
}

fn write_pgpass_entry(
    pgpass: &Path,
    dbhost: &str,
    dbname: &str,
    username: &str,
    password: &str,
) -> io::Result<()> {
    let authline = format!(
        "{}:{}:{}:{}:{}",
        dbhost, POSTGRES_PORT, dbname, username, password
    );

    let existing = fs::read_to_string(pgpass).unwrap_or_default();
    if !existing.lines().any(|line| line == authline) {
        let mut file = OpenOptions::new().create(true).append(true).open(pgpass)?;
        writeln!(file, "{}", authline)?;
    }
    fs::set_permissions(pgpass, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Host, Resource};
    use crate::test_utils::MockTransport;
    use tempfile::TempDir;

    fn driver_for(spec: PostgresSpec, target: &Path) -> PostgresDriver {
        let config = DumpConfig::from_yaml_str(&format!(
            "target: {}\ntimestamp: false\n",
            target.display()
        ))
        .unwrap();
        let object = DumpObject::new(
            Resource::Postgres(spec.clone()),
            Host {
                hostname: Some("db-1".into()),
                address: Some("10.0.0.5".into()),
                ..Default::default()
            },
            2,
        );
        PostgresDriver::new(&object, spec, &config)
    }

    #[test]
    fn test_snapshot_runs_mktemp_dump_and_cleanup() {
        let workdir = TempDir::new().unwrap();
        let target = workdir.path().join("dump");
        let spec = PostgresSpec {
            dbhost: "localhost".into(),
            dbname: "nova".into(),
            username: "postgres".into(),
            password: None,
        };
        let driver = driver_for(spec, &target);
        let transport = MockTransport::healthy("db-1", "/tmp/tmp.abc123\n");
        driver.snapshot(&transport).unwrap();

        let commands = transport.commands();
        assert_eq!(commands[0], "mktemp");
        assert_eq!(
            commands[1],
            "pg_dump -h localhost -U postgres -w -f /tmp/tmp.abc123 nova"
        );
        assert_eq!(commands[2], "rm -f /tmp/tmp.abc123");

        // The fetched temp file was renamed to <dbhost>_<dbname>.sql.
        let dump = target.join("db-1/pg_dump/localhost_nova.sql");
        assert!(dump.exists());
    }

    #[test]
    fn test_pgpass_entry_is_idempotent() {
        let home = TempDir::new().unwrap();
        let pgpass = home.path().join(".pgpass");

        write_pgpass_entry(&pgpass, "localhost", "nova", "postgres", "secret").unwrap();
        write_pgpass_entry(&pgpass, "localhost", "nova", "postgres", "secret").unwrap();

        let content = fs::read_to_string(&pgpass).unwrap();
        assert_eq!(content, "localhost:5432:nova:postgres:secret\n");

        let mode = fs::metadata(&pgpass).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_pgpass_keeps_other_entries() {
        let home = TempDir::new().unwrap();
        let pgpass = home.path().join(".pgpass");

        write_pgpass_entry(&pgpass, "localhost", "nova", "postgres", "secret").unwrap();
        write_pgpass_entry(&pgpass, "db-2", "keystone", "postgres", "other").unwrap();

        let content = fs::read_to_string(&pgpass).unwrap();
        assert_eq!(
            content,
            "localhost:5432:nova:postgres:secret\ndb-2:5432:keystone:postgres:other\n"
        );
    }

    #[test]
    fn test_unreachable_host_propagates() {
        let workdir = TempDir::new().unwrap();
        let target = workdir.path().join("dump");
        let spec = PostgresSpec {
            dbhost: "localhost".into(),
            dbname: "nova".into(),
            username: "postgres".into(),
            password: None,
        };
        let driver = driver_for(spec, &target);
        let transport = MockTransport::unreachable("10.0.0.5");
        assert!(matches!(
            driver.snapshot(&transport),
            Err(crate::error::DumpError::UnreachableHost { .. })
        ));
    }
}
