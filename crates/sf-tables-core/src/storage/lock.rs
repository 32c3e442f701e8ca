use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use log::debug;

use crate::storage::{StorageError, StorageLocation, StorageResult, create_parent_dir, join_local};

/// Advisory lock on a single partition.
///
/// The lock is a file created with create-new semantics; a second
/// `acquire` on the same path fails with `StorageError::AlreadyExists` until
/// the holder drops its guard. Nothing in the table store checks the lock on
/// its own. It only serializes callers that agree to acquire it.
#[derive(Debug)]
pub struct PartitionLock {
    path: PathBuf,
    _file: File,
}

impl PartitionLock {
    /// Create the lock file at `rel_path`, failing if it already exists.
    ///
    /// The file records the holder's process id for debugging.
    pub fn acquire(location: &StorageLocation, rel_path: &Path) -> StorageResult<Self> {
        let abs = join_local(location, rel_path);
        create_parent_dir(&abs)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&abs)
            .map_err(|e| StorageError::from_io(&abs, e))?;

        writeln!(file, "{}", std::process::id()).map_err(|e| StorageError::from_io(&abs, e))?;
        debug!("acquired partition lock {}", abs.display());

        Ok(Self {
            path: abs,
            _file: file,
        })
    }

    /// Absolute path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PartitionLock {
    fn drop(&mut self) {
        // Best-effort; a stale lock file has to be removed by hand.
        let _ = fs::remove_file(&self.path);
        debug!("released partition lock {}", self.path.display());
    }
}
