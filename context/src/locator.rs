//! # Entry Script Locator
//!
//! Finds a process's entry script by searching upward for a marker file
//! (for example `manage.py`) that identifies the project root.

use std::path::{Path, PathBuf};

use errors::LocatorError;
use tracing::{debug, trace};

/// Search from `start` upward through parent directories for `marker`.
///
/// Returns the absolute path of the first marker found, or
/// [`LocatorError::NotFoundOnPath`] once the filesystem root is reached.
pub fn find_marker(start: &Path, marker: &str) -> Result<PathBuf, LocatorError> {
    let start = absolute(start)?;
    let mut current = start.as_path();

    loop {
        let candidate = current.join(marker);
        if candidate.exists() {
            debug!("Found {} at {:?}", marker, candidate);
            return Ok(candidate);
        }

        match current.parent() {
            Some(parent) if parent != current => current = parent,
            _ => break
        }
    }

    trace!("No {} found above {:?}", marker, start);
    Err(LocatorError::NotFoundOnPath {
        marker: marker.to_string(),
        start
    })
}

/// Resolve the entry script path relative to the current directory.
///
/// See [`locate_entry_script_from`].
pub fn locate_entry_script(
    script: Option<&Path>,
    marker: &str
) -> Result<Option<PathBuf>, LocatorError> {
    let cwd = std::env::current_dir().map_err(|e| LocatorError::Io {
        path: PathBuf::from("."),
        reason: e.to_string()
    })?;
    locate_entry_script_from(&cwd, script, marker)
}

/// Resolve the entry script path, searching for the project root from
/// `start_dir`.
///
/// - `None` means no entry script is known and yields `Ok(None)`
/// - an absolute path is returned unchanged
/// - a relative path that exists under `start_dir` is returned in absolute form
/// - any other relative path is joined onto the directory holding `marker`,
///   and must exist there
pub fn locate_entry_script_from(
    start_dir: &Path,
    script: Option<&Path>,
    marker: &str
) -> Result<Option<PathBuf>, LocatorError> {
    let Some(script) = script else {
        return Ok(None);
    };

    if script.is_absolute() {
        return Ok(Some(script.to_path_buf()));
    }

    let direct = start_dir.join(script);
    if direct.exists() {
        return absolute(&direct).map(Some);
    }

    let marker_path = find_marker(start_dir, marker)?;
    let root = marker_path.parent().unwrap_or(Path::new("/"));
    let candidate = root.join(script);

    if candidate.exists() {
        Ok(Some(candidate))
    } else {
        Err(LocatorError::NotFoundOnPath {
            marker: script.display().to_string(),
            start: root.to_path_buf()
        })
    }
}

fn absolute(path: &Path) -> Result<PathBuf, LocatorError> {
    std::path::absolute(path).map_err(|e| LocatorError::Io {
        path: path.to_path_buf(),
        reason: e.to_string()
    })
}
