//! Resource drivers and the dispatch registry.
//!
//! Every object kind has exactly one driver. A driver turns the declarative
//! resource description into filesystem side effects under
//! `target/<host>/...` (`snapshot`) or into comparable report rows
//! (`report`, for the kinds that support it). Drivers never mutate queue
//! state: the only failure they let escape is `UnreachableHost`, which the
//! manager feeds back into the queue.

mod command;
mod file;
mod offline;
mod postgres;
mod xmlrpc;

pub use command::CommandDriver;
pub use file::FileDriver;
pub use offline::OfflineDriver;
pub use postgres::PostgresDriver;
pub use xmlrpc::XmlRpcDriver;

use crate::config::DumpConfig;
use crate::error::{DumpError, Result};
use crate::models::{DumpObject, ObjectStatus, ReportEntry};
use crate::transport::Transport;

/// One collection action bound to a single dump object.
pub trait Driver {
    /// Produce this object's artifact under the target tree. Best-effort:
    /// command failures are captured as data, only `UnreachableHost`
    /// propagates.
    fn snapshot(&self, transport: &dyn Transport) -> Result<()>;

    /// Produce report rows for this object. Kinds that do not support
    /// reporting yield nothing.
    fn report(&self, _transport: &dyn Transport) -> Result<Vec<ReportEntry>> {
        Ok(Vec::new())
    }
}

/// Pure lookup from an object to its driver.
///
/// Objects that exhausted their retry budget get the offline-marker driver
/// regardless of their declared kind, so the run records the unreachable
/// host instead of dialing out again.
pub fn select_driver(object: &DumpObject, config: &DumpConfig) -> Result<Box<dyn Driver>> {
    use crate::models::Resource;

    if object.status == ObjectStatus::Offline {
        return Ok(Box::new(OfflineDriver::new(object, config)));
    }
    match &object.resource {
        Resource::File(spec) | Resource::Dir(spec) => {
            Ok(Box::new(FileDriver::new(object, spec.clone(), config)))
        }
        Resource::Postgres(spec) => Ok(Box::new(PostgresDriver::new(object, spec.clone(), config))),
        Resource::Xmlrpc(spec) => Ok(Box::new(XmlRpcDriver::new(object, spec.clone(), config))),
        Resource::Command(spec) => Ok(Box::new(CommandDriver::new(
            object,
            spec.command.to_vec(),
            &spec.to_file,
            config,
        ))),
        Resource::ContainerCommand(spec) => {
            Ok(Box::new(CommandDriver::with_containers(object, spec, config)))
        }
        Resource::Unsupported => Err(DumpError::UnsupportedKind(format!(
            "object for host {}",
            object.host.report_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileSpec, Host, Resource};

    fn object_with(resource: Resource) -> DumpObject {
        DumpObject::new(resource, Host::local(), 2)
    }

    #[test]
    fn test_unsupported_kind_is_a_dispatch_error() {
        let config = DumpConfig::default();
        let object = object_with(Resource::Unsupported);
        assert!(matches!(
            select_driver(&object, &config),
            Err(DumpError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn test_offline_objects_get_the_marker_driver_regardless_of_kind() {
        let config = DumpConfig::default();
        let mut object = object_with(Resource::File(FileSpec {
            path: "/var/log".into(),
            exclude: Vec::new(),
        }));
        object.status = ObjectStatus::Offline;
        // The marker driver is selected even though the declared kind has a
        // perfectly good driver of its own.
        assert!(select_driver(&object, &config).is_ok());

        // An offline object of an unsupported kind must not error either.
        let mut unsupported = object_with(Resource::Unsupported);
        unsupported.status = ObjectStatus::Offline;
        assert!(select_driver(&unsupported, &config).is_ok());
    }
}
