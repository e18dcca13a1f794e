//! Transport variant for the machine running the collection itself.

use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

use log::debug;
use walkdir::WalkDir;

use crate::error::Result;
use crate::models::CommandOut;
use crate::transport::Transport;

/// Runs commands through `sh -c` and fetches paths with a plain recursive
/// copy. No network step, so it never reports an unreachable host.
pub struct LocalTransport;

impl Transport for LocalTransport {
    fn run(&self, command: &str) -> Result<CommandOut> {
        debug!("Running local command: {}", command);
        let output = Command::new("sh").arg("-c").arg(command).output()?;
        Ok(CommandOut {
            return_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn fetch(&self, path: &Path, dest_dir: &Path) -> Result<()> {
        debug!(
            "Getting local path: {} -> {}",
            path.display(),
            dest_dir.display()
        );
        fs::create_dir_all(dest_dir)?;
        let dest = match path.file_name() {
            Some(name) => dest_dir.join(name),
            None => dest_dir.to_path_buf(),
        };
        copy_recursively(path, &dest)?;
        Ok(())
    }
}

fn copy_recursively(src: &Path, dest: &Path) -> Result<()> {
    let metadata = fs::metadata(src)?;
    if !metadata.is_dir() {
        fs::copy(src, dest)?;
        return Ok(());
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        } else {
            // Dangling symlinks and special files are not worth failing a
            // best-effort snapshot over.
            debug!("Skipping special file {}", entry.path().display());
        }
    }
    Ok(())
}
