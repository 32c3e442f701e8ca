#![allow(missing_docs)]

mod common;

use std::collections::HashSet;
use std::fs;

use common::*;
use sf_tables_core::{
    ColumnType, Database, DatabaseConfig, ErrorKind, MergeError, Namespace, Table, TableError,
    TableSchema, YearRouting, storage::StorageLocation,
};
use tempfile::TempDir;

fn prices(tmp: &TempDir) -> Table {
    init_logging();
    Table::new(StorageLocation::local(tmp.path()), prices_schema("prices"))
}

fn stored(table: &Table, year: i32) -> Result<arrow::array::RecordBatch, TableError> {
    table.read(Some(year))?.collect()
}

#[test]
fn create_if_not_exists_is_idempotent() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);

    assert!(!table.exists(2020));
    assert!(table.create_if_not_exists(2020)?);
    assert!(table.exists(2020));
    assert!(!table.create_if_not_exists(2020)?);

    let scan = table.read(Some(2020))?;
    assert_eq!(scan.num_rows(), 0);
    assert_eq!(
        scan.schema().fields(),
        table.schema().arrow_schema().fields()
    );
    assert!(tmp.path().join("prices/prices_2020.parquet").is_file());
    Ok(())
}

#[test]
fn fresh_upsert_stores_exactly_the_incoming_row() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    table.create_if_not_exists(2020)?;

    let report = table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[day(2020, 1, 1)])),
            ("id", strs(&["A"])),
            ("x", floats(&[Some(1.0)])),
        ]),
    )?;
    assert_eq!((report.rows_before, report.rows_after), (0, 1));
    assert_eq!(report.columns, 3);

    let rows = stored(&table, 2020)?;
    assert_eq!(col_date(&rows, "date"), vec![Some(day(2020, 1, 1))]);
    assert_eq!(col_str(&rows, "id"), vec![Some("A".to_string())]);
    assert_eq!(col_f64(&rows, "x"), vec![Some(1.0)]);
    Ok(())
}

#[test]
fn upsert_correction_keeps_value_under_null_and_adds_new_key() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    table.create_if_not_exists(2020)?;
    let d = day(2020, 1, 1);

    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d])),
            ("id", strs(&["A"])),
            ("x", floats(&[Some(1.0)])),
        ]),
    )?;
    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d, d])),
            ("id", strs(&["A", "B"])),
            ("x", floats(&[None, Some(2.0)])),
        ]),
    )?;

    let rows = stored(&table, 2020)?;
    assert_eq!(
        col_str(&rows, "id"),
        vec![Some("A".to_string()), Some("B".to_string())]
    );
    assert_eq!(col_f64(&rows, "x"), vec![Some(1.0), Some(2.0)]);
    Ok(())
}

#[test]
fn update_refreshes_existing_keys_and_drops_new_ones() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    table.create_if_not_exists(2020)?;
    let d = day(2020, 3, 2);

    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d])),
            ("id", strs(&["A"])),
            ("x", floats(&[Some(1.0)])),
        ]),
    )?;
    let report = table.update(
        2020,
        batch(vec![
            ("date", dates(&[d, d])),
            ("id", strs(&["A", "C"])),
            ("x", floats(&[Some(5.0), Some(7.0)])),
        ]),
        None,
    )?;
    assert_eq!((report.rows_before, report.rows_after), (1, 1));

    let rows = stored(&table, 2020)?;
    assert_eq!(col_str(&rows, "id"), vec![Some("A".to_string())]);
    assert_eq!(col_f64(&rows, "x"), vec![Some(5.0)]);
    Ok(())
}

#[test]
fn update_on_custom_columns() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    table.create_if_not_exists(2020)?;
    let (d1, d2) = (day(2020, 1, 2), day(2020, 1, 3));

    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d1, d2])),
            ("id", strs(&["A", "B"])),
            ("x", floats(&[Some(1.0), Some(2.0)])),
        ]),
    )?;
    // Key on `id` alone: every row of "B" is refreshed regardless of date.
    table.update(
        2020,
        batch(vec![("id", strs(&["B"])), ("x", floats(&[Some(20.0)]))]),
        Some(&["id"][..]),
    )?;

    let rows = stored(&table, 2020)?;
    assert_eq!(col_f64(&rows, "x"), vec![Some(1.0), Some(20.0)]);
    Ok(())
}

#[test]
fn update_with_null_incoming_value_keeps_stored_value() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    table.create_if_not_exists(2020)?;
    let d = day(2020, 4, 1);

    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d, d])),
            ("id", strs(&["A", "B"])),
            ("x", floats(&[Some(1.0), Some(2.0)])),
        ]),
    )?;
    table.update(
        2020,
        batch(vec![
            ("date", dates(&[d, d])),
            ("id", strs(&["A", "B"])),
            ("x", floats(&[None, Some(20.0)])),
        ]),
        None,
    )?;

    let rows = stored(&table, 2020)?;
    assert_eq!(col_f64(&rows, "x"), vec![Some(1.0), Some(20.0)]);
    Ok(())
}

#[test]
fn upsert_twice_equals_upsert_once() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    table.create_if_not_exists(2021)?;
    let d = day(2021, 5, 5);

    table.upsert(
        2021,
        batch(vec![
            ("date", dates(&[d, d])),
            ("id", strs(&["A", "B"])),
            ("x", floats(&[Some(1.0), None])),
        ]),
    )?;
    let incoming = batch(vec![
        ("date", dates(&[d, d])),
        ("id", strs(&["B", "C"])),
        ("x", floats(&[Some(2.0), Some(3.0)])),
    ]);

    table.upsert(2021, incoming.clone())?;
    let once = stored(&table, 2021)?;
    table.upsert(2021, incoming)?;
    let twice = stored(&table, 2021)?;

    assert_eq!(once, twice);
    assert_eq!(col_f64(&twice, "x"), vec![Some(1.0), Some(2.0), Some(3.0)]);
    Ok(())
}

#[test]
fn keys_stay_unique_across_overlapping_upserts() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    table.create_if_not_exists(2022)?;

    for start in 0..4u32 {
        let days: Vec<i32> = (start..start + 5).map(|d| day(2022, 1, d + 1)).collect();
        let ids: Vec<&str> = (0..5).map(|i| if i % 2 == 0 { "A" } else { "B" }).collect();
        let xs: Vec<Option<f64>> = (0..5).map(|i| Some(f64::from(start * 10 + i))).collect();
        table.upsert(
            2022,
            batch(vec![("date", dates(&days)), ("id", strs(&ids)), ("x", floats(&xs))]),
        )?;
    }

    let rows = stored(&table, 2022)?;
    let keys: HashSet<(Option<i32>, Option<String>)> = col_date(&rows, "date")
        .into_iter()
        .zip(col_str(&rows, "id"))
        .collect();
    assert_eq!(keys.len(), rows.num_rows());
    Ok(())
}

#[test]
fn local_only_columns_survive_merges() -> TestResult {
    let tmp = TempDir::new()?;
    let schema = TableSchema::try_new(
        "legacy",
        vec![
            ("date".to_string(), ColumnType::Date),
            ("id".to_string(), ColumnType::Utf8),
            ("x".to_string(), ColumnType::Float64),
            ("note".to_string(), ColumnType::Utf8),
        ],
        ["date", "id"],
    )?;
    let table = Table::new(StorageLocation::local(tmp.path()), schema);
    table.create_if_not_exists(2020)?;
    let d = day(2020, 6, 1);

    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d])),
            ("id", strs(&["A"])),
            ("x", floats(&[Some(1.0)])),
            ("note", strs(&["kept"])),
        ]),
    )?;
    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d, d])),
            ("id", strs(&["A", "B"])),
            ("x", floats(&[Some(2.0), Some(3.0)])),
        ]),
    )?;

    let rows = stored(&table, 2020)?;
    assert_eq!(column_names(&rows), ["date", "id", "x", "note"]);
    assert_eq!(col_str(&rows, "note"), vec![Some("kept".to_string()), None]);
    assert_eq!(col_f64(&rows, "x"), vec![Some(2.0), Some(3.0)]);
    Ok(())
}

#[test]
fn local_only_columns_survive_updates() -> TestResult {
    let tmp = TempDir::new()?;
    let schema = TableSchema::try_new(
        "legacy",
        vec![
            ("date".to_string(), ColumnType::Date),
            ("id".to_string(), ColumnType::Utf8),
            ("x".to_string(), ColumnType::Float64),
            ("note".to_string(), ColumnType::Utf8),
        ],
        ["date", "id"],
    )?;
    let table = Table::new(StorageLocation::local(tmp.path()), schema);
    table.create_if_not_exists(2020)?;
    let d = day(2020, 6, 1);

    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d, d])),
            ("id", strs(&["A", "B"])),
            ("x", floats(&[Some(1.0), Some(2.0)])),
            ("note", strs(&["first", "second"])),
        ]),
    )?;
    table.update(
        2020,
        batch(vec![
            ("date", dates(&[d])),
            ("id", strs(&["B"])),
            ("x", floats(&[Some(4.0)])),
        ]),
        None,
    )?;

    let rows = stored(&table, 2020)?;
    assert_eq!(column_names(&rows), ["date", "id", "x", "note"]);
    assert_eq!(
        col_str(&rows, "note"),
        vec![Some("first".to_string()), Some("second".to_string())]
    );
    assert_eq!(col_f64(&rows, "x"), vec![Some(1.0), Some(4.0)]);
    Ok(())
}

#[test]
fn mutations_and_reads_require_an_existing_partition() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    let rows = batch(vec![
        ("date", dates(&[day(2020, 1, 1)])),
        ("id", strs(&["A"])),
        ("x", floats(&[Some(1.0)])),
    ]);

    let err = table.upsert(2020, rows.clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = table.update(2020, rows.clone(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = table
        .update_asof(2020, rows, sf_tables_core::AsOfSpec::new("date", "date"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = table.read(Some(2020)).unwrap_err();
    assert!(matches!(err, TableError::PartitionNotFound { year: 2020, .. }));
    assert!(!tmp.path().join("prices").exists());
    Ok(())
}

#[test]
fn failed_merge_leaves_partition_file_untouched() -> TestResult {
    let tmp = TempDir::new()?;
    let table = prices(&tmp);
    table.create_if_not_exists(2020)?;
    let d = day(2020, 1, 1);
    table.upsert(
        2020,
        batch(vec![
            ("date", dates(&[d])),
            ("id", strs(&["A"])),
            ("x", floats(&[Some(1.0)])),
        ]),
    )?;
    let path = table.partition_path(2020);
    let before = fs::read(&path)?;

    // Duplicate incoming key.
    let err = table
        .upsert(
            2020,
            batch(vec![
                ("date", dates(&[d, d])),
                ("id", strs(&["B", "B"])),
                ("x", floats(&[Some(1.0), Some(2.0)])),
            ]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);
    assert!(matches!(
        err,
        TableError::Merge {
            source: MergeError::DuplicateKey { .. },
            ..
        }
    ));

    // Null incoming key.
    let err = table
        .upsert(
            2020,
            batch(vec![
                ("date", dates(&[d])),
                ("id", opt_strs(&[None])),
                ("x", floats(&[Some(1.0)])),
            ]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);

    // Type mismatch on a shared column.
    let err = table
        .upsert(
            2020,
            batch(vec![
                ("date", dates(&[d])),
                ("id", strs(&["A"])),
                ("x", strs(&["oops"])),
            ]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);

    // Key column missing from the incoming rows.
    let err = table
        .upsert(2020, batch(vec![("id", strs(&["A"])), ("x", floats(&[None]))]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    assert_eq!(fs::read(&path)?, before);
    assert!(!path.with_extension("tmp").exists());
    Ok(())
}

#[test]
fn strict_routing_rejects_rows_from_other_years() -> TestResult {
    let tmp = TempDir::new()?;
    let config = DatabaseConfig::new(tmp.path()).with_routing(YearRouting::Strict);
    let db = Database::with_config(Namespace::Development, config);
    let signals = db.signals();
    signals.create_if_not_exists(2020)?;

    let row = |date: Option<i32>| {
        batch(vec![
            ("date", opt_dates(&[date])),
            ("barrid", strs(&["USA0001"])),
            ("name", strs(&["momentum"])),
            ("signal", floats(&[Some(0.5)])),
        ])
    };

    let err = signals.upsert(2020, row(Some(day(2021, 1, 4)))).unwrap_err();
    assert!(matches!(
        err,
        TableError::MisroutedRow {
            year: 2020,
            row_year: 2021,
            ..
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Data);

    let err = signals.upsert(2020, row(None)).unwrap_err();
    assert!(matches!(err, TableError::NullPartitionValue { row: 0, .. }));

    let report = signals.upsert(2020, row(Some(day(2020, 12, 31))))?;
    assert_eq!(report.rows_after, 1);
    Ok(())
}

#[test]
fn strict_routing_leaves_updates_unchecked() -> TestResult {
    let tmp = TempDir::new()?;
    let config = DatabaseConfig::new(tmp.path()).with_routing(YearRouting::Strict);
    let db = Database::with_config(Namespace::Development, config);
    let signals = db.signals();
    signals.create_if_not_exists(2020)?;

    signals.upsert(
        2020,
        batch(vec![
            ("date", dates(&[day(2020, 5, 4)])),
            ("barrid", strs(&["USA0001"])),
            ("name", strs(&["momentum"])),
            ("score", floats(&[Some(0.1)])),
        ]),
    )?;

    // No date column: the update is keyed on barrid alone.
    let report = signals.update(
        2020,
        batch(vec![
            ("barrid", strs(&["USA0001"])),
            ("score", floats(&[Some(0.9)])),
        ]),
        Some(&["barrid"][..]),
    )?;
    assert_eq!((report.rows_before, report.rows_after), (1, 1));

    // Update never inserts, so a row dated in another year is simply ignored.
    signals.update(
        2020,
        batch(vec![
            ("date", dates(&[day(2021, 1, 4)])),
            ("barrid", strs(&["USA0002"])),
            ("name", strs(&["momentum"])),
            ("score", floats(&[Some(0.5)])),
        ]),
        None,
    )?;

    let rows = stored(&signals, 2020)?;
    assert_eq!(col_str(&rows, "barrid"), vec![Some("USA0001".to_string())]);
    assert_eq!(col_f64(&rows, "score"), vec![Some(0.9)]);
    Ok(())
}

#[test]
fn trusting_routing_stores_rows_where_told() -> TestResult {
    let tmp = TempDir::new()?;
    let db = Database::new(Namespace::Research, tmp.path());
    let signals = db.signals();
    signals.create_if_not_exists(2020)?;

    signals.upsert(
        2020,
        batch(vec![
            ("date", dates(&[day(2021, 1, 4)])),
            ("barrid", strs(&["USA0001"])),
            ("name", strs(&["value"])),
        ]),
    )?;
    assert_eq!(signals.read(Some(2020))?.num_rows(), 1);
    assert!(
        tmp.path()
            .join("research/signals/signals_2020.parquet")
            .is_file()
    );
    Ok(())
}
