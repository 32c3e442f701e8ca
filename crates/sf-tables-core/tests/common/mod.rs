#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{
    ArrayRef, AsArray, Date32Array, Float64Array, Int64Array, RecordBatch, StringArray,
};
use arrow::datatypes::{Date32Type, Field, Float64Type, Int64Type, Schema};
use chrono::NaiveDate;
use sf_tables_core::{ColumnType, TableSchema};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Route the library's `log` output to the test harness. Set `RUST_LOG` to see it.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Days since the Unix epoch for a calendar date.
pub fn day(y: i32, m: u32, d: u32) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    date.signed_duration_since(epoch).num_days() as i32
}

pub fn dates(v: &[i32]) -> ArrayRef {
    Arc::new(Date32Array::from(v.to_vec()))
}

pub fn opt_dates(v: &[Option<i32>]) -> ArrayRef {
    Arc::new(Date32Array::from(v.to_vec()))
}

pub fn strs(v: &[&str]) -> ArrayRef {
    Arc::new(StringArray::from(v.to_vec()))
}

pub fn opt_strs(v: &[Option<&str>]) -> ArrayRef {
    Arc::new(StringArray::from(v.to_vec()))
}

pub fn floats(v: &[Option<f64>]) -> ArrayRef {
    Arc::new(Float64Array::from(v.to_vec()))
}

pub fn ints(v: &[Option<i64>]) -> ArrayRef {
    Arc::new(Int64Array::from(v.to_vec()))
}

/// Batch with nullable fields named and typed after `cols`.
pub fn batch(cols: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = cols
        .iter()
        .map(|(n, a)| Field::new(*n, a.data_type().clone(), true))
        .collect();
    let arrays = cols.into_iter().map(|(_, a)| a).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).unwrap()
}

/// `{date, id, x}` keyed on `(date, id)`, partitioned by `date`.
pub fn prices_schema(name: &str) -> TableSchema {
    TableSchema::try_new(
        name,
        vec![
            ("date".to_string(), ColumnType::Date),
            ("id".to_string(), ColumnType::Utf8),
            ("x".to_string(), ColumnType::Float64),
        ],
        ["date", "id"],
    )
    .unwrap()
    .with_partition_column("date")
    .unwrap()
}

pub fn col_f64(batch: &RecordBatch, name: &str) -> Vec<Option<f64>> {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_primitive::<Float64Type>()
        .iter()
        .collect()
}

pub fn col_i64(batch: &RecordBatch, name: &str) -> Vec<Option<i64>> {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_primitive::<Int64Type>()
        .iter()
        .collect()
}

pub fn col_date(batch: &RecordBatch, name: &str) -> Vec<Option<i32>> {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_primitive::<Date32Type>()
        .iter()
        .collect()
}

pub fn col_str(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
    batch
        .column_by_name(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}
