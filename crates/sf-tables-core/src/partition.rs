//! Partition snapshots.
//!
//! A [`Partition`] is the complete content of one `<table>_<year>.parquet`
//! file, held in memory. Merges never modify a snapshot; they produce a new
//! one, which is written back with a single temp-file-and-rename commit.

use std::{fs::File, path::Path};

use arrow::{
    array::RecordBatch,
    compute::concat_batches,
    datatypes::SchemaRef,
};
use log::debug;
use parquet::{
    arrow::{ArrowWriter, arrow_reader::ParquetRecordBatchReaderBuilder},
    file::properties::WriterProperties,
};
use snafu::ResultExt;

use crate::{
    layout,
    merge::{MergeOutput, MergeRequest, MergeResult},
    schema::TableSchema,
    storage::{self, StorageError, StorageLocation},
    table::error::{
        ArrowSnafu, ParquetReadSnafu, ParquetWriteSnafu, PartitionNotFoundSnafu, StorageSnafu,
        TableResult,
    },
};

/// One year of one table, fully materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    year: i32,
    batch: RecordBatch,
}

impl Partition {
    /// Wrap `batch` as the content of `year`.
    pub fn new(year: i32, batch: RecordBatch) -> Self {
        Self { year, batch }
    }

    /// An empty partition with the declared schema.
    pub fn empty(year: i32, schema: &TableSchema) -> Self {
        Self::new(year, schema.empty_batch())
    }

    /// Partition year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Rows of the partition.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Schema stored in the partition file.
    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Consume the snapshot, keeping its rows.
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }

    /// Apply `request` to this snapshot, producing the next one.
    pub fn merge(&self, request: &MergeRequest) -> MergeResult<(Partition, MergeOutput)> {
        let output = request.apply(&self.batch)?;
        let next = Partition::new(self.year, output.batch().clone());
        Ok((next, output))
    }

    /// Read the partition `year` of `table` under `location`.
    pub(crate) fn load(location: &StorageLocation, table: &str, year: i32) -> TableResult<Self> {
        let rel = layout::partition_rel_path(table, year);
        let file = match storage::open_file(location, &rel) {
            Ok(file) => file,
            Err(StorageError::NotFound { .. }) => {
                return PartitionNotFoundSnafu { table, year }.fail();
            }
            Err(e) => return Err(e).context(StorageSnafu),
        };

        let path = location.resolve(&rel);
        let batch = read_parquet(file, &path)?;
        debug!(
            "loaded {table} partition {year}: {} rows, {} columns",
            batch.num_rows(),
            batch.num_columns()
        );
        Ok(Self::new(year, batch))
    }

    /// Replace the partition file of `table` with this snapshot.
    ///
    /// The file is written beside the target and renamed into place, so a
    /// reader opening the file sees the old or the new content in full.
    pub(crate) fn commit(
        &self,
        location: &StorageLocation,
        table: &str,
        props: WriterProperties,
    ) -> TableResult<()> {
        let rel = layout::partition_rel_path(table, self.year);
        let path = location.resolve(&rel).display().to_string();

        let mut sink = storage::open_output_sink(location, &rel).context(StorageSnafu)?;
        {
            let mut writer = ArrowWriter::try_new(sink.writer(), self.batch.schema(), Some(props))
                .context(ParquetWriteSnafu { path: path.as_str() })?;
            if self.batch.num_rows() > 0 {
                writer
                    .write(&self.batch)
                    .context(ParquetWriteSnafu { path: path.as_str() })?;
            }
            writer
                .close()
                .context(ParquetWriteSnafu { path: path.as_str() })?;
        }
        sink.finish().context(StorageSnafu)?;

        debug!("committed {path} ({} rows)", self.batch.num_rows());
        Ok(())
    }
}

fn read_parquet(file: File, path: &Path) -> TableResult<RecordBatch> {
    let display = path.display().to_string();
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context(ParquetReadSnafu { path: display.as_str() })?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .context(ParquetReadSnafu { path: display.as_str() })?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context(ArrowSnafu)?;
    concat_batches(&schema, &batches).context(ArrowSnafu)
}

/// Read a whole Parquet file into one batch.
pub fn read_parquet_file(path: impl AsRef<Path>) -> TableResult<RecordBatch> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| StorageError::from_io(path, e))
        .context(StorageSnafu)?;
    read_parquet(file, path)
}
