//! Filesystem storage primitives.
//!
//! This module centralizes all direct filesystem access for `sf-tables-core`.
//! It maps a storage root to absolute paths and provides:
//!
//! - existence checks and directory listings used to discover partitions,
//! - an [`OutputSink`] that streams bytes to a temporary file and renames it
//!   into place on [`OutputSink::finish`], so a reader opening the target
//!   anew sees either the old or the new complete file,
//! - an advisory [`PartitionLock`] with create-new semantics.
//!
//! Only the local filesystem is supported. All operations are blocking.

mod error;
mod lock;
mod sink;

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use snafu::ResultExt;

pub use error::{BackendError, StorageError, StorageResult};
pub(crate) use error::OtherIoSnafu;
pub use lock::PartitionLock;
pub use sink::{OutputSink, open_output_sink};

/// Root of a storage backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageLocation {
    /// A directory on the local filesystem.
    Local(PathBuf),
    // Future:
    // S3 { bucket: String, prefix: String },
}

impl StorageLocation {
    /// Creates a new `StorageLocation` for a local filesystem path.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        StorageLocation::Local(root.into())
    }

    /// Root directory of this location.
    pub fn root(&self) -> &Path {
        match self {
            StorageLocation::Local(root) => root,
        }
    }

    /// A location rooted at `rel` under this one.
    pub fn child(&self, rel: impl AsRef<Path>) -> Self {
        match self {
            StorageLocation::Local(root) => StorageLocation::Local(root.join(rel)),
        }
    }

    /// Absolute path of `rel` under this location.
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        join_local(self, rel)
    }
}

/// Join a location with a relative path into an absolute local path.
pub(crate) fn join_local(location: &StorageLocation, rel: &Path) -> PathBuf {
    match location {
        StorageLocation::Local(root) => root.join(rel),
    }
}

pub(crate) fn create_parent_dir(abs: &Path) -> StorageResult<()> {
    if let Some(parent) = abs.parent() {
        fs::create_dir_all(parent)
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: parent.display().to_string(),
            })?;
    }
    Ok(())
}

/// Guard that removes a temporary file on drop unless disarmed.
/// Used to ensure cleanup on error paths during atomic writes.
pub(crate) struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Disarm the guard so the file is NOT removed on drop.
    /// Call this after a successful rename.
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort cleanup; we're likely already handling another error.
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Returns true iff `rel_path` names a regular file under `location`.
pub fn is_file(location: &StorageLocation, rel_path: &Path) -> bool {
    join_local(location, rel_path).is_file()
}

/// Open the file at `rel_path` for reading.
///
/// A missing file is reported as `StorageError::NotFound`; a path that exists
/// but is not a regular file is treated the same way.
pub fn open_file(location: &StorageLocation, rel_path: &Path) -> StorageResult<File> {
    let abs = join_local(location, rel_path);

    let meta = fs::metadata(&abs).map_err(|e| StorageError::from_io(&abs, e))?;
    if !meta.is_file() {
        return Err(StorageError::from_io(
            &abs,
            io::Error::new(io::ErrorKind::NotFound, "not a regular file"),
        ));
    }

    File::open(&abs).map_err(|e| StorageError::from_io(&abs, e))
}

/// List the names of regular files directly under `rel_dir`, sorted.
///
/// A missing directory yields an empty list; any other failure is an error.
pub fn list_file_names(location: &StorageLocation, rel_dir: &Path) -> StorageResult<Vec<String>> {
    let abs = join_local(location, rel_dir);

    let entries = match fs::read_dir(&abs) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::from_io(&abs, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::from_io(&abs, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| StorageError::from_io(&entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
