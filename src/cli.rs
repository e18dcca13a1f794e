use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the fleetsnap tool.
#[derive(Parser, Debug)]
#[clap(
    name = "fleetsnap",
    about = "Best-effort diagnostic snapshot collector for host fleets"
)]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the collector.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect a snapshot of the fleet and bundle it into an archive
    Snapshot {
        /// Path to the snapshot config file
        #[clap(short, long)]
        config: PathBuf,
    },

    /// Run the report probes and print host/probe/output columns
    Report {
        /// Path to the report config file
        #[clap(short, long)]
        config: PathBuf,
    },
}
