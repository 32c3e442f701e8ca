use std::{error::Error, fmt, io};

use snafu::{Backtrace, prelude::*};

/// Result of a filesystem operation on the store.
pub type StorageResult<T> = Result<T, StorageError>;

/// Raw failure reported by the filesystem backend.
#[derive(Debug)]
pub enum BackendError {
    /// Error from `std::fs`.
    Local(io::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Local(e) => write!(f, "filesystem: {e}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Local(e) => Some(e),
        }
    }
}

/// Failures of partition, temp-file and lock IO, tagged with the path involved.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StorageError {
    /// A partition or directory is missing.
    #[snafu(display("No such file: {path}"))]
    NotFound {
        /// Absolute path that was opened.
        path: String,
        /// Backend failure.
        source: BackendError,
        /// Where the error was raised.
        backtrace: Backtrace,
    },

    /// A create-new open found the file present (a held partition lock).
    #[snafu(display("File already exists: {path}"))]
    AlreadyExists {
        /// Absolute path that was created.
        path: String,
        /// Backend failure.
        source: BackendError,
        /// Where the error was raised.
        backtrace: Backtrace,
    },

    /// Any other filesystem failure.
    #[snafu(display("IO error at {path}: {source}"))]
    OtherIo {
        /// Absolute path being accessed.
        path: String,
        /// Backend failure.
        source: BackendError,
        /// Where the error was raised.
        backtrace: Backtrace,
    },
}

impl StorageError {
    /// Wrap an `io::Error` for `path`, classifying `NotFound` and
    /// `AlreadyExists` by error kind.
    pub(crate) fn from_io(path: &std::path::Path, e: io::Error) -> Self {
        let path = path.display().to_string();
        match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound {
                path,
                source: BackendError::Local(e),
                backtrace: Backtrace::capture(),
            },
            io::ErrorKind::AlreadyExists => StorageError::AlreadyExists {
                path,
                source: BackendError::Local(e),
                backtrace: Backtrace::capture(),
            },
            _ => StorageError::OtherIo {
                path,
                source: BackendError::Local(e),
                backtrace: Backtrace::capture(),
            },
        }
    }

    /// Path the failing operation was addressing.
    pub fn path(&self) -> &str {
        match self {
            StorageError::NotFound { path, .. }
            | StorageError::AlreadyExists { path, .. }
            | StorageError::OtherIo { path, .. } => path,
        }
    }
}
