//! Terminal driver for objects whose host stayed unreachable.

use std::fs;
use std::io;
use std::path::PathBuf;

use log::{debug, warn};

use crate::config::DumpConfig;
use crate::constants::OFFLINE_MARKER_FILE;
use crate::drivers::Driver;
use crate::error::Result;
use crate::models::DumpObject;
use crate::transport::Transport;

/// Writes a human-readable marker at `target/<host>/OFFLINE_NODE.txt` so the
/// archive records which hosts were missing from the snapshot.
///
/// Idempotent across repeated dispatch (several exhausted objects usually
/// share one host) and deliberately infallible: there is nothing left to
/// retry for an offline object, so write failures are only logged.
pub struct OfflineDriver {
    host: String,
    target_path: PathBuf,
}

impl OfflineDriver {
    pub fn new(object: &DumpObject, config: &DumpConfig) -> Self {
        let host = object.host.report_name();
        let target_path = config.target().join(&host).join(OFFLINE_MARKER_FILE);
        Self { host, target_path }
    }

    fn write_marker(&self) -> io::Result<()> {
        if self.target_path.exists() {
            debug!("Offline marker for {} already written", self.host);
            return Ok(());
        }
        if let Some(parent) = self.target_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(
            &self.target_path,
            format!(
                "Host {} was offline/unreachable during the collection run.\n",
                self.host
            ),
        )
    }
}

impl Driver for OfflineDriver {
    fn snapshot(&self, _transport: &dyn Transport) -> Result<()> {
        if let Err(err) = self.write_marker() {
            warn!(
                "Failed to write offline marker for {}: {}",
                self.host, err
            );
        }
        Ok(())
    }
}
