//! Error types for fleetsnap.
//!
//! Only `UnreachableHost` is control flow: the manager feeds it back into the
//! work queue for retry bookkeeping. Everything else either aborts the run
//! (`OutOfSpace`, `UnsupportedKind`, archive and I/O failures) or is captured
//! as data inside the artifact a driver produces and never shows up here.

use thiserror::Error;

/// Top-level error type for the fleetsnap application
#[derive(Error, Debug)]
pub enum DumpError {
    /// The remote endpoint could not be reached; transient and host-scoped.
    #[error("host {host} is unreachable")]
    UnreachableHost { host: String },

    /// An object declared a kind no driver handles.
    #[error("unsupported object kind ({0})")]
    UnsupportedKind(String),

    /// The compression pipeline ran the device out of space.
    #[error("no space left on device while archiving the dump tree")]
    OutOfSpace,

    /// The compression pipeline failed for a reason other than disk space.
    #[error("archiver failed: {stderr}")]
    Archive { stderr: String },

    /// Configuration errors
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DumpError {
    /// True for the one error kind the orchestration layer special-cases.
    pub fn is_network(&self) -> bool {
        matches!(self, DumpError::UnreachableHost { .. })
    }

    /// Numeric OS error code of the innermost failure, when one exists.
    /// The CLI uses this as the process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            DumpError::OutOfSpace => libc::ENOSPC,
            DumpError::Io(err) => err.raw_os_error().unwrap_or(1),
            _ => 1,
        }
    }
}

/// Result type alias for DumpError
pub type Result<T> = std::result::Result<T, DumpError>;
