#[cfg(unix)]
use std::{fs::Permissions, os::unix::fs::PermissionsExt as _};
use std::{fs, path::Path};

use crate::error::{FileSystemError, FileSystemResult};

/// Creates a directory structure if it doesn't exist.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|err| {
            FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "create",
                source: err,
            }
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Marks a file as executable (`0o755`).
#[cfg(unix)]
pub fn make_executable<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    fs::set_permissions(path, Permissions::from_mode(0o755)).map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "chmod",
            source: err,
        }
    })
}

/// Checks that the file exists; there is no executable bit to set outside unix.
#[cfg(not(unix))]
pub fn make_executable<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    fs::metadata(path).map(|_| ()).map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "stat",
            source: err,
        }
    })
}

/// Lists the regular files directly inside `dir` whose extension is `ext`, sorted by name.
pub fn files_with_extension<P: AsRef<Path>>(
    dir: P,
    ext: &str,
) -> FileSystemResult<Vec<std::path::PathBuf>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|err| {
        FileSystemError::Directory {
            path: dir.to_path_buf(),
            action: "read",
            source: err,
        }
    })?;

    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();

    Ok(files)
}
