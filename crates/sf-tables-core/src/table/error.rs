//! Error types and SNAFU context selectors for table operations.
//!
//! `TableError` is the error type of the public table API. Selectors are
//! exposed crate-wide (`#[snafu(visibility(pub(crate)))]`) so the partition
//! and scan modules can attach context without re-exporting them.

use std::fmt;

use arrow::{datatypes::DataType, error::ArrowError};
use parquet::errors::ParquetError;
use snafu::prelude::*;

use crate::{merge::MergeError, storage::StorageError, temporal::TemporalError};

/// Coarse classification of failures, for callers that branch on the kind
/// of problem rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required partition does not exist.
    NotFound,
    /// The request names a column that the data does not have.
    Configuration,
    /// The data itself is unusable (types, keys, temporal values, routing).
    Data,
    /// Reading or writing the backing files failed.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Data => "data error",
            ErrorKind::Storage => "storage error",
        };
        f.write_str(s)
    }
}

/// Errors from table operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TableError {
    /// The partition for `year` has not been created.
    #[snafu(display("Partition {year} of table {table} does not exist"))]
    PartitionNotFound {
        /// Table name.
        table: String,
        /// Requested year.
        year: i32,
    },

    /// Storage error while accessing partition files.
    #[snafu(display("Storage error while accessing table data: {source}"))]
    Storage {
        /// Underlying storage error.
        #[snafu(source, backtrace)]
        source: StorageError,
    },

    /// Parquet read error while opening or scanning a partition.
    #[snafu(display("Parquet read error for {path}: {source}"))]
    ParquetRead {
        /// File being read.
        path: String,
        /// Underlying Parquet error.
        source: ParquetError,
    },

    /// Parquet write error while committing a partition.
    #[snafu(display("Parquet write error for {path}: {source}"))]
    ParquetWrite {
        /// File being written.
        path: String,
        /// Underlying Parquet error.
        source: ParquetError,
    },

    /// Arrow error while decoding or assembling batches.
    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The merge engine rejected the request.
    #[snafu(display("Merge into {table} partition {year} failed: {source}"))]
    Merge {
        /// Table name.
        table: String,
        /// Target year.
        year: i32,
        /// Underlying merge error.
        source: MergeError,
    },

    /// Two partitions store the same column with different types.
    #[snafu(display(
        "Column {column} of table {table} is {expected} in earlier partitions but {found} in {year}"
    ))]
    SchemaConflict {
        /// Table name.
        table: String,
        /// Conflicting column.
        column: String,
        /// Partition where the conflict was found.
        year: i32,
        /// Type seen first.
        expected: DataType,
        /// Type found in `year`.
        found: DataType,
    },

    /// A projection names a column the scan does not produce.
    #[snafu(display("Table {table} has no column {column}"))]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Requested column.
        column: String,
    },

    /// A projection selects no columns.
    #[snafu(display("A scan of table {table} must select at least one column"))]
    EmptyProjection {
        /// Table name.
        table: String,
    },

    /// Strict routing: the incoming batch lacks the partition column.
    #[snafu(display(
        "Incoming rows for {table} lack the partition column {column} required for year routing"
    ))]
    MissingPartitionColumn {
        /// Table name.
        table: String,
        /// Partition column.
        column: String,
    },

    /// Strict routing: the partition column cannot be mapped to a year.
    #[snafu(display("Cannot route rows of {table} by {column}: {source}"))]
    Routing {
        /// Table name.
        table: String,
        /// Partition column.
        column: String,
        /// Underlying temporal error.
        source: TemporalError,
    },

    /// Strict routing: an incoming row has no partition value.
    #[snafu(display("Incoming row {row} for {table} partition {year} has a null {column}"))]
    NullPartitionValue {
        /// Table name.
        table: String,
        /// Target year.
        year: i32,
        /// Partition column.
        column: String,
        /// Offending row.
        row: usize,
    },

    /// Strict routing: an incoming row belongs to another year.
    #[snafu(display(
        "Incoming row {row} for {table} partition {year} has {column} in year {row_year}"
    ))]
    MisroutedRow {
        /// Table name.
        table: String,
        /// Target year.
        year: i32,
        /// Partition column.
        column: String,
        /// Offending row.
        row: usize,
        /// Year of the row's partition value.
        row_year: i32,
    },
}

impl TableError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::PartitionNotFound { .. } => ErrorKind::NotFound,
            TableError::Merge { source, .. } => source.kind(),
            TableError::UnknownColumn { .. }
            | TableError::EmptyProjection { .. }
            | TableError::MissingPartitionColumn { .. } => ErrorKind::Configuration,
            TableError::SchemaConflict { .. }
            | TableError::Routing { .. }
            | TableError::NullPartitionValue { .. }
            | TableError::MisroutedRow { .. } => ErrorKind::Data,
            TableError::Storage { .. }
            | TableError::ParquetRead { .. }
            | TableError::ParquetWrite { .. }
            | TableError::Arrow { .. } => ErrorKind::Storage,
        }
    }
}

/// A convenience type alias for table results.
pub type TableResult<T> = Result<T, TableError>;
