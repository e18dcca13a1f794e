use std::fs;
use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

use fleetsnap::cli::{Args, Commands};
use fleetsnap::config::DumpConfig;
use fleetsnap::error::DumpError;
use fleetsnap::manager::Manager;

fn main() {
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("Error: {:#}", err);
        process::exit(exit_code(&err));
    }
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Commands::Snapshot { config } => {
            let config = DumpConfig::from_yaml_file(config)?;
            // The run log doubles as an artifact: the self-log object
            // collects it at the end of the snapshot.
            initialize_logging(args.verbose, Some(&config.log_file))?;
            info!("Starting fleet snapshot");

            let manager = Manager::new(&config);
            let archive_path = match manager.snapshot() {
                Ok(path) => path,
                Err(err) => {
                    error!("Snapshot failed: {}", err);
                    return Err(err.into());
                }
            };
            info!("Snapshot path: {}", archive_path.display());
            println!("{}", archive_path.display());
            Ok(())
        }
        Commands::Report { config } => {
            let config = DumpConfig::from_yaml_file(config)?;
            initialize_logging(args.verbose, None)?;

            let manager = Manager::new(&config);
            println!("HOST\tREPORTER\tREPORT");
            for entry in manager.report()? {
                println!("{}\t{}\t{}", entry.host, entry.descriptor, entry.output);
            }
            Ok(())
        }
    }
}

/// Initialize logging with the specified verbosity level. When a log file is
/// given, everything down to debug is mirrored into it.
fn initialize_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match fs::File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(
                LevelFilter::Debug,
                simplelog::Config::default(),
                file,
            )),
            Err(err) => eprintln!("Cannot open log file {}: {}", path.display(), err),
        }
    }
    CombinedLogger::init(loggers).context("Failed to initialize logger")?;
    Ok(())
}

/// Exit with the numeric error code of the innermost failure when one is
/// available, else a generic non-zero code.
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(dump_err) = err.downcast_ref::<DumpError>() {
        dump_err.exit_code()
    } else if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
        io_err.raw_os_error().unwrap_or(1)
    } else {
        1
    }
}
