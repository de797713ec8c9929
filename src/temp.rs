//! Temporary file management module
//!
//! This module provides RAII-based temporary file handling used to write
//! the output document atomically.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Guard for a temporary sibling of a target file
///
/// The temporary file is deleted on drop unless it was moved onto its
/// target with [`TempGuard::persist`].
#[derive(Debug)]
pub(crate) struct TempGuard {
    path: PathBuf,
    persisted: bool,
}

impl TempGuard {
    /// Get the path to the temporary file
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Renames the temporary file onto `target`
    pub(crate) fn persist(mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.persisted {
            // Silently ignore errors during cleanup
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Creates an empty temporary file next to `target`
///
/// The name is derived from the target's file name and a ULID, so the final
/// rename never crosses a file system boundary.
pub(crate) fn create_sibling_temp_file(target: &Path) -> io::Result<TempGuard> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());

    let ulid = ulid::Ulid::new();
    let path = dir.join(format!(".{}.{}.tmp", stem, ulid));

    File::create(&path)?;

    Ok(TempGuard {
        path,
        persisted: false,
    })
}
