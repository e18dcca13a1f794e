//! The abstract capability for executing commands and fetching paths,
//! locally or on a remote host.
//!
//! Connection-phase failures (TCP connect, handshake, authentication) map to
//! the distinguished `UnreachableHost` error the work queue keys its retry
//! bookkeeping on. Everything after a session is up is either captured as
//! data ([`crate::models::CommandOut`]) or surfaced as a plain I/O error for
//! the driver to absorb.

mod local;
mod ssh;

pub use local::LocalTransport;
pub use ssh::SshTransport;

use crate::error::Result;
use crate::models::{CommandOut, DumpObject};

use std::path::Path;

/// Executes a command or fetches a path on behalf of one dump object.
pub trait Transport {
    /// Run a shell command, capturing exit code and both output streams.
    fn run(&self, command: &str) -> Result<CommandOut>;

    /// Copy a file or directory tree into `dest_dir`, preserving the source
    /// basename (`/var/log` lands at `dest_dir/log`).
    fn fetch(&self, path: &Path, dest_dir: &Path) -> Result<()>;
}

/// Selects a transport for each dump object.
///
/// Split out as a trait so tests can substitute scripted transports for the
/// real dial-out.
pub trait TransportFactory {
    fn for_object(&self, object: &DumpObject) -> Result<Box<dyn Transport>>;
}

/// Production factory: SSH for objects with a network address, the local
/// shell for everything else.
pub struct HostTransportFactory {
    default_timeout: u64,
}

impl HostTransportFactory {
    pub fn new(default_timeout: u64) -> Self {
        Self { default_timeout }
    }
}

impl TransportFactory for HostTransportFactory {
    fn for_object(&self, object: &DumpObject) -> Result<Box<dyn Transport>> {
        let timeout = object.timeout.unwrap_or(self.default_timeout);
        match object.network_address() {
            Some(address) => Ok(Box::new(SshTransport::new(
                address,
                object.host.username(),
                object.host.ssh_key.clone(),
                timeout,
            ))),
            None => Ok(Box::new(LocalTransport)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileSpec, Host, Resource};

    #[test]
    fn test_factory_selects_local_for_hostless_objects() {
        let factory = HostTransportFactory::new(60);
        let object = DumpObject::new(
            Resource::File(FileSpec {
                path: "/var/log".into(),
                exclude: Vec::new(),
            }),
            Host::local(),
            2,
        );
        // Local transport runs commands without any network step.
        let transport = factory.for_object(&object).unwrap();
        let out = transport.run("echo local").unwrap();
        assert_eq!(out.return_code, Some(0));
        assert_eq!(out.stdout.trim(), "local");
    }
}
