//! Compresses the dump tree into the final `<target>.tar.xz` artifact.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::error::{DumpError, Result};

/// Marker searched for in the compression pipeline's stderr. The pipeline's
/// exit code does not reliably reflect a downstream space failure, so the
/// text is the only dependable signal.
const NO_SPACE_MARKER: &str = "no space left";

/// Archive file produced for a given dump tree.
pub fn archive_path(target: &Path) -> PathBuf {
    PathBuf::from(format!("{}.tar.xz", target.display()))
}

/// Compress `target` into `<target>.tar.xz`.
///
/// `excludes` are passed through as literal `--exclude` patterns relative to
/// the tree being archived. On success the uncompressed tree is removed
/// unless `keep_target` is set. A full disk surfaces as
/// [`DumpError::OutOfSpace`]; any other tar failure carries the stderr text.
pub fn compress(target: &Path, level: u8, excludes: &[String], keep_target: bool) -> Result<PathBuf> {
    let parent = target.parent().filter(|p| !p.as_os_str().is_empty()).ok_or_else(|| {
        DumpError::Config(format!(
            "dump target {} has no parent directory",
            target.display()
        ))
    })?;
    let basename = target.file_name().ok_or_else(|| {
        DumpError::Config(format!("dump target {} has no basename", target.display()))
    })?;
    let archive = archive_path(target);
    debug!(
        "Archiving {} to {}",
        target.display(),
        archive.display()
    );

    let mut command = Command::new("tar");
    command
        .arg("-chJf")
        .arg(&archive)
        .arg("-C")
        .arg(parent);
    for exclude in excludes {
        command.arg(format!("--exclude={}", exclude));
    }
    command.arg(basename);
    command
        .env("XZ_OPT", format!("-{}", level))
        // Non-localized output, the stderr text is inspected below.
        .env("LANG", "C")
        .env("LC_ALL", "C");

    let output = command.output()?;
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if is_out_of_space(output.status.code(), &stderr) {
        return Err(DumpError::OutOfSpace);
    }
    if !output.status.success() {
        return Err(DumpError::Archive { stderr });
    }

    if !keep_target {
        fs::remove_dir_all(target)?;
    }
    info!("Archived dump tree to {}", archive.display());
    Ok(archive)
}

/// True when a failed compression run reported a full device on stderr.
pub fn is_out_of_space(code: Option<i32>, stderr: &str) -> bool {
    code.map_or(true, |c| c != 0) && stderr.to_lowercase().contains(NO_SPACE_MARKER)
}
