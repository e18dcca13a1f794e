//! # fleetsnap
//!
//! A best-effort diagnostic snapshot collector for fleets of hosts that may
//! be partially unreachable.
//!
//! ## Overview
//!
//! fleetsnap expands a declarative YAML configuration (roles, hosts, objects)
//! into a work queue of dump objects, drains the queue sequentially through
//! per-kind resource drivers, and bundles whatever could be collected into a
//! single compressed archive. Hosts that stay unreachable are retried across
//! multiple passes, circuit-broken within a pass, and finally recorded with
//! an offline marker instead of failing the run.
//!
//! ## Usage
//!
//! ```no_run
//! use fleetsnap::config::DumpConfig;
//! use fleetsnap::manager::Manager;
//! use std::path::Path;
//!
//! # fn main() -> fleetsnap::error::Result<()> {
//! let config = DumpConfig::from_yaml_file(Path::new("/etc/fleetsnap/snapshot.yaml"))?;
//! let manager = Manager::new(&config);
//!
//! let archive_path = manager.snapshot()?;
//! println!("Snapshot archived to {}", archive_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`config`]: YAML configuration model and run context
//! - [`models`]: Hosts, resource descriptions and dump objects
//! - [`queue`]: The retrying work queue with per-pass host circuit breaking
//! - [`drivers`]: Per-kind collection drivers and the dispatch registry
//! - [`transport`]: Command execution and path fetching, local or over SSH
//! - [`manager`]: Orchestration of one full run
//! - [`archive`]: Compression of the dump tree with disk-space recovery
//! - [`error`]: Error taxonomy and exit-code mapping
//! - [`constants`]: Application-wide defaults

/// Command-line interface definitions and argument parsing
pub mod cli;

/// YAML configuration model and run context
pub mod config;

/// Application constants and default values
pub mod constants;

/// Core data model: hosts, resources and dump objects
pub mod models;

/// The retrying work queue
pub mod queue;

/// Resource drivers and dispatch registry
pub mod drivers;

/// Local and SSH transports
pub mod transport;

/// Run orchestration
pub mod manager;

/// Archive creation
pub mod archive;

/// Error types
pub mod error;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
