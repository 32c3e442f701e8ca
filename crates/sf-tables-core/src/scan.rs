//! Lazy scans over one or more partition files.
//!
//! Opening a [`TableScan`] reads only Parquet footers: the unioned schema and
//! the total row count come from file metadata. Rows are decoded when the
//! scan is iterated, one file after another in ascending year order.
//!
//! Partitions written at different times may carry different column sets.
//! Columns are unioned by name in first-seen order; a column missing from a
//! file is filled with nulls. A column stored with two different types is a
//! [`TableError::SchemaConflict`].

use std::{collections::VecDeque, path::PathBuf, sync::Arc};

use arrow::{
    array::{ArrayRef, RecordBatch, new_null_array},
    compute::concat_batches,
    datatypes::{Field, Schema, SchemaRef},
};
use log::debug;
use parquet::arrow::{
    ProjectionMask,
    arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder},
};
use snafu::{ResultExt, ensure};

use crate::{
    layout,
    schema::{TableSchema, nullable_schema},
    storage::{self, StorageLocation},
    table::error::{
        ArrowSnafu, EmptyProjectionSnafu, ParquetReadSnafu, SchemaConflictSnafu, StorageSnafu,
        TableError, TableResult,
    },
};

/// Default number of rows per decoded batch.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

#[derive(Debug, Clone)]
struct ScanFile {
    year: i32,
    rel_path: PathBuf,
    num_rows: u64,
}

/// A lazy view over some partitions of one table.
#[derive(Debug, Clone)]
pub struct TableScan {
    table: String,
    location: StorageLocation,
    files: Vec<ScanFile>,
    schema: SchemaRef,
    batch_size: usize,
}

impl TableScan {
    /// Open a scan over the given partition years of `table`.
    ///
    /// With no years, the scan is empty and reports the declared schema.
    pub(crate) fn open(
        location: &StorageLocation,
        table: &TableSchema,
        years: &[i32],
    ) -> TableResult<Self> {
        let name = table.name();
        let mut fields: Vec<Field> = Vec::new();
        let mut files = Vec::with_capacity(years.len());

        for &year in years {
            let rel_path = layout::partition_rel_path(name, year);
            let file = storage::open_file(location, &rel_path).context(StorageSnafu)?;
            let path = location.resolve(&rel_path).display().to_string();
            let builder = ParquetRecordBatchReaderBuilder::try_new(file)
                .context(ParquetReadSnafu { path })?;

            for field in builder.schema().fields() {
                match fields.iter().find(|f| f.name() == field.name()) {
                    Some(seen) => {
                        ensure!(
                            seen.data_type() == field.data_type(),
                            SchemaConflictSnafu {
                                table: name,
                                column: field.name().as_str(),
                                year,
                                expected: seen.data_type().clone(),
                                found: field.data_type().clone(),
                            }
                        );
                    }
                    None => fields.push(field.as_ref().clone()),
                }
            }

            let num_rows = builder.metadata().file_metadata().num_rows().max(0) as u64;
            files.push(ScanFile {
                year,
                rel_path,
                num_rows,
            });
        }

        let schema = if files.is_empty() {
            table.arrow_schema().clone()
        } else {
            Arc::new(nullable_schema(&Schema::new(fields)))
        };
        debug!(
            "opened scan of {name} over years {:?} ({} columns)",
            years,
            schema.fields().len()
        );

        Ok(Self {
            table: name.to_string(),
            location: location.clone(),
            files,
            schema,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Output schema.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Years covered, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.files.iter().map(|f| f.year).collect()
    }

    /// Total row count, from file metadata.
    pub fn num_rows(&self) -> u64 {
        self.files.iter().map(|f| f.num_rows).sum()
    }

    /// Restrict the scan to `columns`, in the given order.
    pub fn select<I>(mut self, columns: I) -> TableResult<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut fields = Vec::new();
        for column in columns {
            let column = column.as_ref();
            let field = self
                .schema
                .field_with_name(column)
                .map_err(|_| TableError::UnknownColumn {
                    table: self.table.clone(),
                    column: column.to_string(),
                })?;
            fields.push(field.clone());
        }
        ensure!(
            !fields.is_empty(),
            EmptyProjectionSnafu {
                table: self.table.clone(),
            }
        );
        self.schema = Arc::new(Schema::new(fields));
        Ok(self)
    }

    /// Set the number of rows per decoded batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Iterate over the rows batch by batch.
    pub fn batches(&self) -> ScanBatches {
        ScanBatches {
            location: self.location.clone(),
            pending: self.files.iter().cloned().collect(),
            schema: self.schema.clone(),
            batch_size: self.batch_size,
            current: None,
        }
    }

    /// Decode every row into a single batch.
    pub fn collect(&self) -> TableResult<RecordBatch> {
        let batches = self.batches().collect::<TableResult<Vec<_>>>()?;
        concat_batches(&self.schema, &batches).context(ArrowSnafu)
    }
}

/// Iterator over the batches of a [`TableScan`].
pub struct ScanBatches {
    location: StorageLocation,
    pending: VecDeque<ScanFile>,
    schema: SchemaRef,
    batch_size: usize,
    current: Option<ParquetRecordBatchReader>,
}

impl ScanBatches {
    fn open_next(&mut self, file: &ScanFile) -> TableResult<ParquetRecordBatchReader> {
        let handle = storage::open_file(&self.location, &file.rel_path).context(StorageSnafu)?;
        let path = self.location.resolve(&file.rel_path).display().to_string();
        let builder = ParquetRecordBatchReaderBuilder::try_new(handle)
            .context(ParquetReadSnafu { path: path.as_str() })?;

        let file_schema = builder.schema().clone();
        let roots: Vec<usize> = self
            .schema
            .fields()
            .iter()
            .filter_map(|f| file_schema.index_of(f.name()).ok())
            .collect();
        let mask = ProjectionMask::roots(builder.parquet_schema(), roots);

        builder
            .with_projection(mask)
            .with_batch_size(self.batch_size)
            .build()
            .context(ParquetReadSnafu { path })
    }

    fn align(&self, batch: RecordBatch) -> TableResult<RecordBatch> {
        let columns: Vec<ArrayRef> = self
            .schema
            .fields()
            .iter()
            .map(|f| match batch.column_by_name(f.name()) {
                Some(c) => c.clone(),
                None => new_null_array(f.data_type(), batch.num_rows()),
            })
            .collect();
        RecordBatch::try_new(self.schema.clone(), columns).context(ArrowSnafu)
    }
}

impl Iterator for ScanBatches {
    type Item = TableResult<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reader) = self.current.as_mut() {
                match reader.next() {
                    Some(Ok(batch)) => return Some(self.align(batch)),
                    Some(Err(source)) => {
                        self.current = None;
                        self.pending.clear();
                        return Some(Err(TableError::Arrow { source }));
                    }
                    None => self.current = None,
                }
            }

            let file = self.pending.pop_front()?;
            match self.open_next(&file) {
                Ok(reader) => self.current = Some(reader),
                Err(e) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}
