//! Temporal column helpers shared by the as-of merge and year routing.
//!
//! Temporal columns are compared as raw `i64` values in their native unit
//! (days for `Date32`, milliseconds for `Date64`, the declared unit for
//! timestamps). Both sides of a comparison must share the same Arrow type, so
//! no unit conversion is ever needed.

use arrow::{
    array::{Array, AsArray},
    datatypes::{
        DataType, Date32Type, Date64Type, Int32Type, Int64Type, TimeUnit,
        TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
        TimestampSecondType,
    },
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use snafu::prelude::*;

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Errors raised while interpreting temporal columns.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum TemporalError {
    /// The column type cannot be ordered as a point in time.
    #[snafu(display("Column {column} has unsupported temporal type {datatype}"))]
    Unsupported {
        /// Column being interpreted.
        column: String,
        /// The Arrow type encountered.
        datatype: DataType,
    },

    /// A value cannot be placed on the calendar.
    #[snafu(display("Value {value} in column {column} is outside the supported calendar range"))]
    OutOfRange {
        /// Column being interpreted.
        column: String,
        /// Raw value in the column's native unit.
        value: i64,
    },
}

/// True if `datatype` can be used as an as-of join column.
pub fn is_orderable_temporal(datatype: &DataType) -> bool {
    matches!(
        datatype,
        DataType::Date32
            | DataType::Date64
            | DataType::Timestamp(_, _)
            | DataType::Int32
            | DataType::Int64
    )
}

/// Extract the values of a temporal column as `i64` in its native unit.
pub(crate) fn temporal_values(
    array: &dyn Array,
    column: &str,
) -> Result<Vec<Option<i64>>, TemporalError> {
    let values: Vec<Option<i64>> = match array.data_type() {
        DataType::Date32 => array
            .as_primitive::<Date32Type>()
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        DataType::Date64 => array.as_primitive::<Date64Type>().iter().collect(),
        DataType::Int32 => array
            .as_primitive::<Int32Type>()
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        DataType::Int64 => array.as_primitive::<Int64Type>().iter().collect(),
        DataType::Timestamp(TimeUnit::Second, _) => {
            array.as_primitive::<TimestampSecondType>().iter().collect()
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => array
            .as_primitive::<TimestampMillisecondType>()
            .iter()
            .collect(),
        DataType::Timestamp(TimeUnit::Microsecond, _) => array
            .as_primitive::<TimestampMicrosecondType>()
            .iter()
            .collect(),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => array
            .as_primitive::<TimestampNanosecondType>()
            .iter()
            .collect(),
        other => {
            return UnsupportedSnafu {
                column,
                datatype: other.clone(),
            }
            .fail();
        }
    };
    Ok(values)
}

/// Calendar year of a raw value of a date or timestamp column (UTC).
pub(crate) fn year_of(datatype: &DataType, value: i64, column: &str) -> Result<i32, TemporalError> {
    let date = match datatype {
        DataType::Date32 => i32::try_from(value)
            .ok()
            .and_then(|days| days.checked_add(UNIX_EPOCH_DAYS_FROM_CE))
            .and_then(NaiveDate::from_num_days_from_ce_opt),
        DataType::Date64 => DateTime::from_timestamp_millis(value).map(|dt| dt.date_naive()),
        DataType::Timestamp(unit, _) => timestamp_utc(*unit, value).map(|dt| dt.date_naive()),
        other => {
            return UnsupportedSnafu {
                column,
                datatype: other.clone(),
            }
            .fail();
        }
    };

    date.map(|d| d.year())
        .context(OutOfRangeSnafu { column, value })
}

fn timestamp_utc(unit: TimeUnit, value: i64) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Second => DateTime::from_timestamp(value, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(value),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(value)),
    }
}
