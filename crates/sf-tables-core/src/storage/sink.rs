use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use snafu::ResultExt;

use crate::storage::{
    BackendError, OtherIoSnafu, StorageLocation, StorageResult, TempFileGuard, create_parent_dir,
    join_local,
};

/// A streaming output sink that commits by atomic rename.
///
/// Bytes are written to `<target>.tmp` next to the final path. `finish()`
/// flushes, fsyncs and renames the temporary file over the target. Dropping
/// the sink without calling `finish()` removes the temporary file and leaves
/// any existing target untouched.
pub struct OutputSink {
    tmp_path: PathBuf,
    final_path: PathBuf,
    writer: io::BufWriter<File>,
    guard: TempFileGuard,
}

impl OutputSink {
    /// Mutable handle for streaming bytes into the sink.
    pub fn writer(&mut self) -> &mut io::BufWriter<File> {
        &mut self.writer
    }

    /// Absolute path the sink commits to.
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Flush, fsync, and commit to the final location.
    pub fn finish(mut self) -> StorageResult<()> {
        self.writer
            .flush()
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: self.tmp_path.display().to_string(),
            })?;

        self.writer
            .get_ref()
            .sync_all()
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: self.tmp_path.display().to_string(),
            })?;

        fs::rename(&self.tmp_path, &self.final_path)
            .map_err(BackendError::Local)
            .context(OtherIoSnafu {
                path: self.final_path.display().to_string(),
            })?;

        // Success - the temp file has been renamed, don't remove it.
        self.guard.disarm();
        Ok(())
    }
}

/// Open a streaming output sink at `location` + `rel_path`.
///
/// Parent directories are created as needed.
pub fn open_output_sink(location: &StorageLocation, rel_path: &Path) -> StorageResult<OutputSink> {
    match location {
        StorageLocation::Local(_) => {
            let final_path = join_local(location, rel_path);
            create_parent_dir(&final_path)?;

            let tmp_path = final_path.with_extension("tmp");

            let file = File::create(&tmp_path)
                .map_err(BackendError::Local)
                .context(OtherIoSnafu {
                    path: tmp_path.display().to_string(),
                })?;
            let guard = TempFileGuard::new(tmp_path.clone());

            Ok(OutputSink {
                tmp_path,
                final_path,
                writer: io::BufWriter::new(file),
                guard,
            })
        }
    }
}
