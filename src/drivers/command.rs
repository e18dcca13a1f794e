//! Driver for `command` and `container_command` objects.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use log::debug;

use crate::config::DumpConfig;
use crate::drivers::Driver;
use crate::error::Result;
use crate::models::{ContainerCommandSpec, DumpObject, ReportEntry};
use crate::transport::Transport;

/// Runs one or more shell commands on the object's host and appends command
/// text, return code and both output streams to a single file under
/// `target/<host>/commands/`.
///
/// The container variant is the same driver with every command wrapped in a
/// container-exec prefix, once per configured container.
pub struct CommandDriver {
    host: String,
    commands: Vec<String>,
    target_path: PathBuf,
}

impl CommandDriver {
    pub fn new(
        object: &DumpObject,
        commands: Vec<String>,
        to_file: &str,
        config: &DumpConfig,
    ) -> Self {
        let host = object.host.report_name();
        let target_path = config
            .target()
            .join(&host)
            .join("commands")
            .join(to_file.trim_start_matches('/'));
        Self {
            host,
            commands,
            target_path,
        }
    }

    pub fn with_containers(
        object: &DumpObject,
        spec: &ContainerCommandSpec,
        config: &DumpConfig,
    ) -> Self {
        let containers = spec.container.to_vec();
        let base_commands = spec.command.to_vec();
        let commands = containers
            .iter()
            .flat_map(|container| {
                base_commands.iter().map(move |command| {
                    format!("{} {} {}", config.container_exec, container, command)
                })
            })
            .collect();
        Self::new(object, commands, &spec.to_file, config)
    }

    fn snapshot_single(&self, command: &str, transport: &dyn Transport) -> Result<()> {
        let out = transport.run(command)?;
        if let Some(parent) = self.target_path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Append mode: every command of the object lands in the same file.
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.target_path)?;
        writeln!(file, "===== COMMAND =====: {}", command)?;
        writeln!(
            file,
            "===== RETURN CODE =====: {}",
            out.return_code
                .map(|code| code.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        )?;
        writeln!(file, "===== STDOUT =====:")?;
        file.write_all(out.stdout.as_bytes())?;
        writeln!(file, "\n===== STDERR =====:")?;
        file.write_all(out.stderr.as_bytes())?;
        writeln!(file)?;
        Ok(())
    }
}

impl Driver for CommandDriver {
    fn snapshot(&self, transport: &dyn Transport) -> Result<()> {
        for command in &self.commands {
            debug!("Running command object on {}: {}", self.host, command);
            self.snapshot_single(command, transport)?;
        }
        Ok(())
    }

    fn report(&self, transport: &dyn Transport) -> Result<Vec<ReportEntry>> {
        let mut entries = Vec::new();
        for command in &self.commands {
            let out = transport.run(command)?;
            entries.extend(zip_padded(&self.host, command, &out.stdout));
        }
        Ok(entries)
    }
}

/// Zips the host, command lines and output lines into parallel report rows,
/// padding the shorter side with empty strings. The host appears only on the
/// first row of each command.
fn zip_padded(host: &str, command: &str, output: &str) -> Vec<ReportEntry> {
    let command_lines: Vec<&str> = command.lines().collect();
    let output_lines: Vec<&str> = output.lines().collect();
    let rows = command_lines.len().max(output_lines.len()).max(1);
    (0..rows)
        .map(|row| ReportEntry {
            host: if row == 0 {
                host.to_string()
            } else {
                String::new()
            },
            descriptor: command_lines.get(row).copied().unwrap_or("").to_string(),
            output: output_lines.get(row).copied().unwrap_or("").to_string(),
        })
        .collect()
}
