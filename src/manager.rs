//! Orchestration of one full collection run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::archive;
use crate::config::DumpConfig;
use crate::drivers::select_driver;
use crate::error::{DumpError, Result};
use crate::models::{DumpObject, ReportEntry, Resource};
use crate::queue::DumpQueue;
use crate::transport::{HostTransportFactory, TransportFactory};

type ArchiveFn = fn(&Path, u8, &[String], bool) -> Result<PathBuf>;

/// Drives one run: drains the work queue through the driver registry, feeds
/// network failures back into the queue, archives the result and writes the
/// last-dump pointer file.
pub struct Manager<'a> {
    config: &'a DumpConfig,
    factory: Box<dyn TransportFactory>,
    archiver: ArchiveFn,
}

impl<'a> Manager<'a> {
    pub fn new(config: &'a DumpConfig) -> Self {
        let factory = Box::new(HostTransportFactory::new(config.timeout()));
        Self::with_factory(config, factory)
    }

    /// Construction seam for tests: scripted transports instead of dial-outs.
    pub fn with_factory(config: &'a DumpConfig, factory: Box<dyn TransportFactory>) -> Self {
        Self {
            config,
            factory,
            archiver: archive::compress,
        }
    }

    #[cfg(test)]
    fn with_archiver(mut self, archiver: ArchiveFn) -> Self {
        self.archiver = archiver;
        self
    }

    /// Collect everything, archive it and return the archive path.
    pub fn snapshot(&self) -> Result<PathBuf> {
        debug!("Making snapshot");
        self.clear_target()?;

        let mut queue = DumpQueue::from_config(self.config);
        let mut excludes: Vec<String> = Vec::new();
        while let Some(object) = queue.next() {
            debug!(
                "Dumping {} object for {}",
                object.resource.kind(),
                object.host.report_name()
            );
            match self.dispatch_snapshot(&object) {
                Ok(()) => {
                    // Exclusions declared on file objects also become archive
                    // exclusions, joined with the object's resource path.
                    if let Resource::File(spec) | Resource::Dir(spec) = &object.resource {
                        excludes.extend(spec.exclude.iter().map(|pattern| {
                            format!(
                                "{}/{}",
                                spec.path.trim_end_matches('/'),
                                pattern.trim_start_matches('/')
                            )
                        }));
                    }
                }
                Err(err) if err.is_network() => queue.report_network_failure(object),
                Err(err) => return Err(err),
            }
        }

        // The run's own log goes in last, so it reflects the whole run.
        debug!(
            "Dumping the run log and archiving {}",
            self.config.target().display()
        );
        if let Err(err) = self.dispatch_snapshot(&self.config.self_log_object()) {
            warn!("Failed to dump the run log: {}", err);
        }

        let archive_path = match (self.archiver)(
            self.config.target(),
            self.config.compression_level(),
            &excludes,
            self.config.keep_target,
        ) {
            Ok(path) => path,
            Err(DumpError::OutOfSpace) => {
                // Free what we can, then fail the run: a partial tree that
                // filled the disk is worse than no tree at all.
                warn!("Out of space while archiving, clearing the dump tree");
                self.clear_target()?;
                return Err(DumpError::OutOfSpace);
            }
            Err(err) => return Err(err),
        };

        self.write_lastdump(&archive_path)?;
        let archive_path = self.link_stable_name(archive_path)?;
        info!("Snapshot archived to {}", archive_path.display());
        Ok(archive_path)
    }

    /// Point the configured stable name at the (usually timestamped) archive.
    fn link_stable_name(&self, archive_path: PathBuf) -> Result<PathBuf> {
        let stable = match &self.config.target_symlink {
            Some(stable) => PathBuf::from(format!("{}.tar.xz", stable)),
            None => return Ok(archive_path),
        };
        debug!(
            "Symlinking {} -> {}",
            stable.display(),
            archive_path.display()
        );
        match fs::remove_file(&stable) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        std::os::unix::fs::symlink(&archive_path, &stable)?;
        Ok(stable)
    }

    /// Run every reporting object and flatten the rows in queue-drain order.
    pub fn report(&self) -> Result<Vec<ReportEntry>> {
        debug!("Making report");
        let mut queue = DumpQueue::from_config(self.config);
        let mut entries = Vec::new();
        while let Some(object) = queue.next() {
            debug!(
                "Gathering report for {} object on {}",
                object.resource.kind(),
                object.host.report_name()
            );
            match self.dispatch_report(&object) {
                Ok(mut rows) => entries.append(&mut rows),
                // One bad object must not starve the report of the rest.
                Err(DumpError::UnsupportedKind(kind)) => {
                    warn!("Skipping unsupported object: {}", kind)
                }
                Err(err) if err.is_network() => queue.report_network_failure(object),
                Err(err) => return Err(err),
            }
        }
        Ok(entries)
    }

    fn dispatch_snapshot(&self, object: &DumpObject) -> Result<()> {
        let driver = select_driver(object, self.config)?;
        let transport = self.factory.for_object(object)?;
        driver.snapshot(transport.as_ref())
    }

    fn dispatch_report(&self, object: &DumpObject) -> Result<Vec<ReportEntry>> {
        let driver = select_driver(object, self.config)?;
        let transport = self.factory.for_object(object)?;
        driver.report(transport.as_ref())
    }

    /// Remove any pre-existing output below the target's parent directory.
    fn clear_target(&self) -> Result<()> {
        let parent = match self.config.target().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return Ok(()),
        };
        debug!("Clearing {}", parent.display());
        match fs::remove_dir_all(parent) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Overwrite the pointer file atomically: readers either see the old
    /// archive path or the new one, never a torn write.
    fn write_lastdump(&self, archive_path: &Path) -> Result<()> {
        let lastdump = &self.config.lastdump;
        if let Some(parent) = lastdump.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let staged = lastdump.with_extension("tmp");
        fs::write(&staged, format!("{}\n", archive_path.display()))?;
        fs::rename(&staged, lastdump)?;
        Ok(())
    }
}
