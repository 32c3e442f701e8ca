//! Table layer.
//!
//! A [`Table`] is the user-facing gateway to the yearly partitions of one
//! dataset: existence checks, initialization, lazy reads and the three merge
//! operations.
//!
//! Every mutation is a whole-partition read-modify-write: the stored
//! partition is loaded, merged in memory, then written back with one atomic
//! replace. The file is untouched when any step before the write fails.
//!
//! Mutators take no lock. Callers must ensure a single writer per
//! partition; [`Table::lock_partition`] offers an advisory lock for callers
//! that need to serialize externally.

pub mod error;

use std::{fmt, path::PathBuf, time::Instant};

use arrow::array::RecordBatch;

use log::{debug, info};
use snafu::{OptionExt, ResultExt, ensure};

use crate::{
    config::{PartitionCompression, YearRouting},
    layout,
    merge::{AsOfSpec, MergeRequest},
    partition::Partition,
    scan::TableScan,
    schema::TableSchema,
    storage::{self, PartitionLock, StorageLocation},
    temporal::{temporal_values, year_of},
};

pub use error::{ErrorKind, TableError, TableResult};
use error::{
    MergeSnafu, MisroutedRowSnafu, MissingPartitionColumnSnafu, NullPartitionValueSnafu,
    PartitionNotFoundSnafu, RoutingSnafu, StorageSnafu,
};

/// Per-table write settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableOptions {
    /// Year routing policy for upserts.
    pub routing: YearRouting,
    /// Codec for partition files.
    pub compression: PartitionCompression,
}

/// Summary of one committed merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Table name.
    pub table: String,
    /// Partition year.
    pub year: i32,
    /// Rows stored before the merge.
    pub rows_before: usize,
    /// Rows stored after the merge.
    pub rows_after: usize,
    /// Columns stored after the merge.
    pub columns: usize,
    /// Wall time of the read-merge-write cycle in milliseconds.
    pub elapsed_ms: u128,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} -> {} rows, {} columns ({} ms)",
            self.table, self.year, self.rows_before, self.rows_after, self.columns, self.elapsed_ms
        )
    }
}

/// A named dataset stored as one Parquet file per year.
#[derive(Debug, Clone)]
pub struct Table {
    location: StorageLocation,
    schema: TableSchema,
    options: TableOptions,
}

impl Table {
    /// A table with `schema`, stored under `location` (the namespace root).
    pub fn new(location: StorageLocation, schema: TableSchema) -> Self {
        Self {
            location,
            schema,
            options: TableOptions::default(),
        }
    }

    /// Replace the write settings.
    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Table name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Declared schema and keys.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Write settings.
    pub fn options(&self) -> TableOptions {
        self.options
    }

    /// Namespace root the table lives under.
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Absolute path of the partition file for `year`.
    pub fn partition_path(&self, year: i32) -> PathBuf {
        self.location
            .resolve(&layout::partition_rel_path(self.name(), year))
    }

    /// True iff the partition file for `year` exists.
    pub fn exists(&self, year: i32) -> bool {
        storage::is_file(&self.location, &layout::partition_rel_path(self.name(), year))
    }

    /// Years with a partition file, ascending.
    pub fn years(&self) -> TableResult<Vec<i32>> {
        let dir = layout::table_rel_dir(self.name());
        let names = storage::list_file_names(&self.location, &dir).context(StorageSnafu)?;
        let mut years: Vec<i32> = names
            .iter()
            .filter_map(|n| layout::parse_partition_year(self.name(), n))
            .collect();
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    /// Write an empty partition for `year` unless one exists.
    ///
    /// Returns `true` if a partition was created.
    pub fn create_if_not_exists(&self, year: i32) -> TableResult<bool> {
        if self.exists(year) {
            debug!("{} partition {year} already exists", self.name());
            return Ok(false);
        }
        Partition::empty(year, &self.schema).commit(
            &self.location,
            self.name(),
            self.options.compression.writer_properties(),
        )?;
        info!(
            "created empty {} partition {year} at {}",
            self.name(),
            self.partition_path(year).display()
        );
        Ok(true)
    }

    /// Lazy view over `year`, or over every partition when `year` is `None`.
    pub fn read(&self, year: Option<i32>) -> TableResult<TableScan> {
        let years = match year {
            Some(year) => {
                if !self.exists(year) {
                    return PartitionNotFoundSnafu {
                        table: self.name(),
                        year,
                    }
                    .fail();
                }
                vec![year]
            }
            None => self.years()?,
        };
        TableScan::open(&self.location, &self.schema, &years)
    }

    /// Load the full content of `year`.
    pub fn load_partition(&self, year: i32) -> TableResult<Partition> {
        Partition::load(&self.location, self.name(), year)
    }

    /// Full outer merge of `rows` into `year` on the primary key.
    pub fn upsert(&self, year: i32, rows: RecordBatch) -> TableResult<MergeReport> {
        self.check_routing(year, &rows)?;
        let request = MergeRequest::upsert(rows, self.schema.primary_key().iter().cloned());
        self.merge_into(year, &request)
    }

    /// Left merge of `rows` into `year` on `on`, or the primary key.
    ///
    /// Never inserts rows, so strict routing does not apply.
    pub fn update(
        &self,
        year: i32,
        rows: RecordBatch,
        on: Option<&[&str]>,
    ) -> TableResult<MergeReport> {
        let request = match on {
            Some(on) => MergeRequest::update(rows, on.iter().copied()),
            None => MergeRequest::update(rows, self.schema.primary_key().iter().cloned()),
        };
        self.merge_into(year, &request)
    }

    /// Temporal merge of `right_rows` into `year`.
    pub fn update_asof(
        &self,
        year: i32,
        right_rows: RecordBatch,
        spec: AsOfSpec,
    ) -> TableResult<MergeReport> {
        let request = MergeRequest::as_of(right_rows, spec);
        self.merge_into(year, &request)
    }

    /// Take the advisory lock of `year`.
    ///
    /// Fails with `StorageError::AlreadyExists` while another holder has it.
    /// The lock is released when the guard is dropped.
    pub fn lock_partition(&self, year: i32) -> TableResult<PartitionLock> {
        PartitionLock::acquire(
            &self.location,
            &layout::partition_lock_rel_path(self.name(), year),
        )
        .context(StorageSnafu)
    }

    fn merge_into(&self, year: i32, request: &MergeRequest) -> TableResult<MergeReport> {
        let start = Instant::now();
        let current = self.load_partition(year)?;
        let (next, _output) = current.merge(request).context(MergeSnafu {
            table: self.name(),
            year,
        })?;

        next.commit(
            &self.location,
            self.name(),
            self.options.compression.writer_properties(),
        )?;

        let report = MergeReport {
            table: self.name().to_string(),
            year,
            rows_before: current.num_rows(),
            rows_after: next.num_rows(),
            columns: next.batch().num_columns(),
            elapsed_ms: start.elapsed().as_millis(),
        };
        info!("merged {report}");
        Ok(report)
    }

    /// Under strict routing, reject upsert rows whose partition value is
    /// null or in another year.
    fn check_routing(&self, year: i32, rows: &RecordBatch) -> TableResult<()> {
        if self.options.routing == YearRouting::Trust {
            return Ok(());
        }
        let Some(column) = self.schema.partition_column() else {
            return Ok(());
        };

        let values = rows
            .column_by_name(column)
            .context(MissingPartitionColumnSnafu {
                table: self.name(),
                column,
            })?;
        let datatype = values.data_type();
        let raw = temporal_values(values.as_ref(), column).context(RoutingSnafu {
            table: self.name(),
            column,
        })?;

        for (row, value) in raw.into_iter().enumerate() {
            let value = value.context(NullPartitionValueSnafu {
                table: self.name(),
                year,
                column,
                row,
            })?;
            let row_year = year_of(datatype, value, column).context(RoutingSnafu {
                table: self.name(),
                column,
            })?;
            ensure!(
                row_year == year,
                MisroutedRowSnafu {
                    table: self.name(),
                    year,
                    column,
                    row,
                    row_year,
                }
            );
        }
        Ok(())
    }
}
