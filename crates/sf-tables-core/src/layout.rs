//! On-disk layout helpers for a namespace root.
//!
//! This module centralizes all *relative* path conventions under a namespace
//! root:
//! - one directory per table (`<table>/`)
//! - one Parquet file per year (`<table>/<table>_<year>.parquet`)
//! - advisory lock files beside them (`<table>/<table>_<year>.lock`)
//!
//! The functions here return relative [`PathBuf`] values. Callers join them
//! with a [`crate::storage::StorageLocation`] before doing IO.

use std::path::PathBuf;

/// File extension of partition files.
pub const PARTITION_EXT: &str = "parquet";

/// File extension of advisory partition locks.
pub const LOCK_EXT: &str = "lock";

/// Relative path: `<table>/`
pub fn table_rel_dir(table: &str) -> PathBuf {
    PathBuf::from(table)
}

/// File name of a partition: `<table>_<year>.parquet`
pub fn partition_file_name(table: &str, year: i32) -> String {
    format!("{table}_{year}.{PARTITION_EXT}")
}

/// Relative path: `<table>/<table>_<year>.parquet`
pub fn partition_rel_path(table: &str, year: i32) -> PathBuf {
    table_rel_dir(table).join(partition_file_name(table, year))
}

/// Relative path: `<table>/<table>_<year>.lock`
pub fn partition_lock_rel_path(table: &str, year: i32) -> PathBuf {
    table_rel_dir(table).join(format!("{table}_{year}.{LOCK_EXT}"))
}

/// Recover the year from a partition file name, if `file_name` is one of
/// `table`'s partitions.
///
/// Only the exact `<table>_<year>.parquet` shape written by
/// [`partition_file_name`] matches (decimal digits, optionally negative), so
/// a table whose name is a prefix of another (`crsp` vs `crsp_daily`) never
/// picks up the other table's files, and temporary or lock files are ignored.
pub fn parse_partition_year(table: &str, file_name: &str) -> Option<i32> {
    let rest = file_name.strip_prefix(table)?.strip_prefix('_')?;
    let digits = rest.strip_suffix(PARTITION_EXT)?.strip_suffix('.')?;

    let unsigned = digits.strip_prefix('-').unwrap_or(digits);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
