//! Year-partitioned table store with keyed merge semantics.
//!
//! This crate provides the storage kernel shared by the ingestion
//! pipelines:
//!
//! - A fixed catalog of tables (`catalog` module) bound to a namespace
//!   directory by a [`Database`].
//! - A [`Table`] gateway over one Parquet file per year, with existence
//!   checks, lazy [`TableScan`] reads, and three merges: full-outer upsert,
//!   left update, and temporal as-of.
//! - The in-memory merge engine (`merge` module) computing a [`ColumnPlan`]
//!   from both runtime schemas and resolving conflicts by preferring
//!   non-null incoming values.
//! - Filesystem primitives (`storage` module) giving atomic
//!   temp-file-and-rename commits and an advisory partition lock.
//!
//! All operations are synchronous. A merge reads the whole partition,
//! merges in memory, and replaces the file only once the merge succeeded.
#![deny(missing_docs)]
pub mod catalog;
pub mod config;
pub mod database;
pub mod layout;
pub mod merge;
pub mod partition;
pub mod scan;
pub mod schema;
pub mod storage;
pub mod table;
pub mod temporal;

pub use config::{ConfigError, DatabaseConfig, PartitionCompression, YearRouting};
pub use database::{Database, Namespace};
pub use merge::{AsOfSpec, AsOfStrategy, ColumnPlan, MergeError, MergeKind, MergeRequest};
pub use partition::{Partition, read_parquet_file};
pub use scan::TableScan;
pub use schema::{ColumnType, TableSchema};
pub use table::{ErrorKind, MergeReport, Table, TableError, TableOptions, TableResult};
