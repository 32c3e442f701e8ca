//! Error types and SNAFU context selectors for the merge engine.

use std::fmt;

use arrow::{datatypes::DataType, error::ArrowError};
use snafu::prelude::*;

use crate::{table::ErrorKind, temporal::TemporalError};

/// Which side of a merge a column was expected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The stored partition.
    Local,
    /// The incoming batch.
    Incoming,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => f.write_str("local"),
            Side::Incoming => f.write_str("incoming"),
        }
    }
}

/// Errors from computing or applying a merge.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MergeError {
    /// A key, grouping or temporal column named by the request is missing.
    #[snafu(display("Column {column} is required but missing from the {side} schema"))]
    MissingColumn {
        /// Name of the missing column.
        column: String,
        /// Side whose schema lacks the column.
        side: Side,
    },

    /// A keyed merge was requested without any key columns.
    #[snafu(display("A keyed merge needs at least one key column"))]
    EmptyKeys,

    /// A key or grouping column has different types on the two sides.
    #[snafu(display(
        "Key column {column} has type {local} locally but {incoming} in the incoming batch"
    ))]
    KeyTypeMismatch {
        /// Name of the key column.
        column: String,
        /// Type in the stored partition.
        local: DataType,
        /// Type in the incoming batch.
        incoming: DataType,
    },

    /// A shared non-key column has different types on the two sides.
    #[snafu(display(
        "Column {column} has type {local} locally but {incoming} in the incoming batch"
    ))]
    TypeMismatch {
        /// Name of the shared column.
        column: String,
        /// Type in the stored partition.
        local: DataType,
        /// Type in the incoming batch.
        incoming: DataType,
    },

    /// The two temporal columns of an as-of merge cannot be compared.
    #[snafu(display(
        "Cannot compare temporal columns {left_on} ({local}) and {right_on} ({incoming})"
    ))]
    TemporalTypeMismatch {
        /// Local temporal column.
        left_on: String,
        /// Incoming temporal column.
        right_on: String,
        /// Type of the local temporal column.
        local: DataType,
        /// Type of the incoming temporal column.
        incoming: DataType,
    },

    /// A temporal column could not be interpreted.
    #[snafu(display("Temporal column error: {source}"))]
    Temporal {
        /// Underlying temporal error.
        source: TemporalError,
    },

    /// Two incoming rows share the same key.
    #[snafu(display(
        "Incoming rows {first} and {second} share the same value for key ({columns})"
    ))]
    DuplicateKey {
        /// Comma-separated key column names.
        columns: String,
        /// Index of the first row with the key.
        first: usize,
        /// Index of the repeated row.
        second: usize,
    },

    /// An incoming row has a null key value.
    #[snafu(display("Incoming row {row} has a null value in key column {column}"))]
    NullKey {
        /// Key column holding the null.
        column: String,
        /// Index of the offending row.
        row: usize,
    },

    /// Arrow compute kernel failure while materializing the result.
    #[snafu(display("Arrow error while merging: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

impl MergeError {
    /// Classify the error into the store's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MergeError::MissingColumn { .. } | MergeError::EmptyKeys => ErrorKind::Configuration,
            MergeError::KeyTypeMismatch { .. }
            | MergeError::TypeMismatch { .. }
            | MergeError::TemporalTypeMismatch { .. }
            | MergeError::Temporal { .. }
            | MergeError::DuplicateKey { .. }
            | MergeError::NullKey { .. }
            | MergeError::Arrow { .. } => ErrorKind::Data,
        }
    }
}

/// A convenience type alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
