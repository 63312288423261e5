//! Plumbing shared by the download-then-extract strategies.

use std::{
    path::Path,
    process::{Command, ExitStatus, Stdio},
    thread,
    time::Duration,
};

use clienthash_utils::hash::digest_file;
use tempfile::TempDir;
use tracing::debug;

use crate::error::{ErrorContext, ExtractError, Result};

/// `ETXTBSY` on Linux.
const TEXT_FILE_BUSY: i32 = 26;
const SPAWN_ATTEMPTS: u32 = 5;

/// Creates a private scratch directory that is removed when the returned guard drops.
pub fn scratch_dir(label: &str) -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("clienthash-{label}-"))
        .tempdir()
        .with_context(|| format!("creating scratch directory for {label}"))
}

/// Digests `path` if it is a regular file, `None` otherwise.
pub fn digest_if_present(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        debug!(path = %path.display(), "extracted member not found");
        return Ok(None);
    }
    Ok(Some(digest_file(path)?))
}

/// Runs `cmd` to completion with stdin, stdout and stderr detached.
///
/// An executable that was just written can still be held open by a child forked on
/// another thread; spawning is retried briefly while the kernel reports it busy.
pub fn run_detached(cmd: &mut Command, program: &str) -> Result<ExitStatus> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let mut attempt = 1;
    loop {
        match cmd.status() {
            Ok(status) => {
                if !status.success() {
                    debug!(program, code = ?status.code(), "extraction tool exited unsuccessfully");
                }
                return Ok(status);
            }
            // Only a spawn that never started is retried; a finished run is returned as is.
            Err(err) if err.raw_os_error() == Some(TEXT_FILE_BUSY) && attempt < SPAWN_ATTEMPTS => {
                attempt += 1;
                thread::sleep(Duration::from_millis(50 * u64::from(attempt)));
            }
            Err(err) => {
                return Err(ExtractError::Spawn {
                    program: program.to_string(),
                    source: err,
                })
            }
        }
    }
}
