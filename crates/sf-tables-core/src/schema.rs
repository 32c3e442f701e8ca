//! Declared table schemas.
//!
//! A [`TableSchema`] fixes the column set of a table (name → [`ColumnType`]),
//! its primary key, and its partition column. Declared schemas are used to
//! create empty partitions and to route rows; merges work from the runtime
//! schemas of the stored partition and the incoming batch instead.

use std::{collections::HashSet, fmt, sync::Arc};

use arrow::{
    array::RecordBatch,
    datatypes::{DataType, Field, Schema, SchemaRef},
};
use snafu::prelude::*;

/// Semantic column types used by the table catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Calendar date (days since the Unix epoch).
    Date,
    /// UTF-8 string.
    Utf8,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// Boolean value.
    Bool,
}

impl ColumnType {
    /// Arrow data type used to store this column.
    pub fn to_arrow(self) -> DataType {
        match self {
            ColumnType::Date => DataType::Date32,
            ColumnType::Utf8 => DataType::Utf8,
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::Bool => DataType::Boolean,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Date => "Date",
            ColumnType::Utf8 => "Utf8",
            ColumnType::Int64 => "Int64",
            ColumnType::Float64 => "Float64",
            ColumnType::Bool => "Bool",
        };
        f.write_str(s)
    }
}

/// Errors raised when a declared table schema is invalid.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum SchemaError {
    /// The table name is empty.
    #[snafu(display("Table name must not be empty"))]
    EmptyName,

    /// A column name appears more than once.
    #[snafu(display("Table {table} declares column {column} more than once"))]
    DuplicateColumn {
        /// Table being declared.
        table: String,
        /// The repeated column name.
        column: String,
    },

    /// The primary key is empty.
    #[snafu(display("Table {table} must declare at least one primary-key column"))]
    EmptyPrimaryKey {
        /// Table being declared.
        table: String,
    },

    /// A primary-key column is not part of the schema.
    #[snafu(display("Primary-key column {column} is not a column of table {table}"))]
    UnknownKeyColumn {
        /// Table being declared.
        table: String,
        /// The unknown key column.
        column: String,
    },

    /// The partition column is not part of the schema.
    #[snafu(display("Partition column {column} is not a column of table {table}"))]
    UnknownPartitionColumn {
        /// Table being declared.
        table: String,
        /// The unknown partition column.
        column: String,
    },
}

/// A convenience type alias for schema declaration results.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Fixed schema and primary key of one logical table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    name: String,
    columns: Vec<(String, ColumnType)>,
    primary_key: Vec<String>,
    partition_column: Option<String>,
    arrow: SchemaRef,
}

impl TableSchema {
    /// Declare a table schema, validating names and keys.
    pub fn try_new<N, C, K>(name: N, columns: C, primary_key: K) -> SchemaResult<Self>
    where
        N: Into<String>,
        C: IntoIterator<Item = (String, ColumnType)>,
        K: IntoIterator,
        K::Item: Into<String>,
    {
        let schema = Self::from_parts(
            name.into(),
            columns.into_iter().collect(),
            primary_key.into_iter().map(Into::into).collect(),
        );
        schema.validate()?;
        Ok(schema)
    }

    /// Build without validation. Used for the hard-coded catalog, whose
    /// definitions are checked by its tests.
    pub(crate) fn from_parts(
        name: String,
        columns: Vec<(String, ColumnType)>,
        primary_key: Vec<String>,
    ) -> Self {
        let fields: Vec<Field> = columns
            .iter()
            .map(|(col, ty)| Field::new(col.as_str(), ty.to_arrow(), true))
            .collect();

        Self {
            name,
            columns,
            primary_key,
            partition_column: None,
            arrow: Arc::new(Schema::new(fields)),
        }
    }

    /// Set the column whose calendar year selects the partition.
    pub fn with_partition_column(mut self, column: impl Into<String>) -> SchemaResult<Self> {
        let column = column.into();
        ensure!(
            self.column_type(&column).is_some(),
            UnknownPartitionColumnSnafu {
                table: self.name.clone(),
                column,
            }
        );
        self.partition_column = Some(column);
        Ok(self)
    }

    pub(crate) fn with_partition_column_unchecked(mut self, column: &str) -> Self {
        self.partition_column = Some(column.to_string());
        self
    }

    /// Check the invariants of a declared schema.
    pub fn validate(&self) -> SchemaResult<()> {
        ensure!(!self.name.is_empty(), EmptyNameSnafu);

        let mut seen = HashSet::new();
        for (col, _) in &self.columns {
            ensure!(
                seen.insert(col.as_str()),
                DuplicateColumnSnafu {
                    table: self.name.clone(),
                    column: col.clone(),
                }
            );
        }

        ensure!(
            !self.primary_key.is_empty(),
            EmptyPrimaryKeySnafu {
                table: self.name.clone(),
            }
        );
        for key in &self.primary_key {
            ensure!(
                seen.contains(key.as_str()),
                UnknownKeyColumnSnafu {
                    table: self.name.clone(),
                    column: key.clone(),
                }
            );
        }

        if let Some(col) = &self.partition_column {
            ensure!(
                seen.contains(col.as_str()),
                UnknownPartitionColumnSnafu {
                    table: self.name.clone(),
                    column: col.clone(),
                }
            );
        }
        Ok(())
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared columns in order.
    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }

    /// Declared type of `column`, if it exists.
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
    }

    /// Primary-key columns in declaration order.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Column used to route rows to yearly partitions.
    pub fn partition_column(&self) -> Option<&str> {
        self.partition_column.as_deref()
    }

    /// Arrow schema for the declared columns. Every field is nullable.
    pub fn arrow_schema(&self) -> &SchemaRef {
        &self.arrow
    }

    /// A batch with the declared schema and zero rows.
    pub fn empty_batch(&self) -> RecordBatch {
        RecordBatch::new_empty(self.arrow.clone())
    }
}

impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (", self.name)?;
        for (i, (col, ty)) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if self.primary_key.contains(col) {
                write!(f, "*")?;
            }
            write!(f, "{col}: {ty}")?;
        }
        write!(f, ")")
    }
}

/// Copy of `schema` with every field made nullable.
///
/// Merge results may contain nulls in any column (inserted rows lack
/// local-only values, unmatched as-of rows lack right-only values).
pub(crate) fn nullable_schema(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_nullable(true))
        .collect();
    Schema::new(fields)
}
