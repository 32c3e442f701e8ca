#![allow(missing_docs)]

mod common;

use std::fs;

use common::*;
use sf_tables_core::{
    AsOfSpec, AsOfStrategy, ColumnType, ErrorKind, Table, TableSchema, storage::StorageLocation,
};
use tempfile::TempDir;

/// `{date, barrid, price, cusip}` keyed on `(date, barrid)`.
fn assets_like(tmp: &TempDir) -> Table {
    init_logging();
    let schema = TableSchema::try_new(
        "holdings",
        vec![
            ("date".to_string(), ColumnType::Date),
            ("barrid".to_string(), ColumnType::Utf8),
            ("price".to_string(), ColumnType::Float64),
            ("cusip".to_string(), ColumnType::Utf8),
        ],
        ["date", "barrid"],
    )
    .unwrap();
    Table::new(StorageLocation::local(tmp.path()), schema)
}

fn seed(table: &Table, year: i32, days: &[i32], ids: &[&str]) -> TestResult {
    table.create_if_not_exists(year)?;
    let prices: Vec<Option<f64>> = (0..days.len()).map(|i| Some(i as f64)).collect();
    table.upsert(
        year,
        batch(vec![
            ("date", dates(days)),
            ("barrid", strs(ids)),
            ("price", floats(&prices)),
        ]),
    )?;
    Ok(())
}

#[test]
fn backward_match_leaves_earlier_rows_unmatched() -> TestResult {
    let tmp = TempDir::new()?;
    let table = assets_like(&tmp);
    seed(&table, 2021, &[day(2021, 1, 1), day(2021, 6, 1)], &["A", "A"])?;

    let reference = batch(vec![
        ("barrid", strs(&["A"])),
        ("start_date", dates(&[day(2021, 3, 1)])),
        ("v", ints(&[Some(9)])),
    ]);
    let spec = AsOfSpec::new("date", "start_date").with_by(["barrid"]);
    table.update_asof(2021, reference, spec)?;

    let rows = table.read(Some(2021))?.collect()?;
    assert_eq!(
        col_date(&rows, "date"),
        vec![Some(day(2021, 1, 1)), Some(day(2021, 6, 1))]
    );
    assert_eq!(col_i64(&rows, "v"), vec![None, Some(9)]);
    Ok(())
}

#[test]
fn backward_match_is_latest_reference_at_or_before() -> TestResult {
    let tmp = TempDir::new()?;
    let table = assets_like(&tmp);
    let local_days: Vec<i32> = (1..=28).step_by(3).map(|d| day(2021, 2, d)).collect();
    let ids = vec!["A"; local_days.len()];
    seed(&table, 2021, &local_days, &ids)?;

    let starts = [day(2021, 1, 15), day(2021, 2, 5), day(2021, 2, 10), day(2021, 2, 20)];
    let reference = batch(vec![
        ("barrid", strs(&["A", "A", "A", "A"])),
        // Deliberately unsorted.
        ("start_date", dates(&[starts[2], starts[0], starts[3], starts[1]])),
        (
            "matched_start",
            ints(&[
                Some(i64::from(starts[2])),
                Some(i64::from(starts[0])),
                Some(i64::from(starts[3])),
                Some(i64::from(starts[1])),
            ]),
        ),
    ]);
    table.update_asof(
        2021,
        reference,
        AsOfSpec::new("date", "start_date").with_by(["barrid"]),
    )?;

    let rows = table.read(Some(2021))?.collect()?;
    for (date, matched) in col_date(&rows, "date")
        .into_iter()
        .zip(col_i64(&rows, "matched_start"))
    {
        let date = date.unwrap();
        let expected = starts.iter().copied().filter(|&s| s <= date).max();
        assert_eq!(matched, expected.map(i64::from), "local date {date}");
    }
    Ok(())
}

#[test]
fn forward_takes_next_reference() -> TestResult {
    let tmp = TempDir::new()?;
    let table = assets_like(&tmp);
    seed(&table, 2021, &[day(2021, 1, 1), day(2021, 6, 1)], &["A", "A"])?;

    let reference = batch(vec![
        ("barrid", strs(&["A", "A"])),
        ("start_date", dates(&[day(2021, 3, 1), day(2021, 3, 1)])),
        ("v", ints(&[Some(1), Some(2)])),
    ]);
    let spec = AsOfSpec::new("date", "start_date")
        .with_by(["barrid"])
        .with_strategy(AsOfStrategy::Forward);
    table.update_asof(2021, reference, spec)?;

    let rows = table.read(Some(2021))?.collect()?;
    // Equal reference timestamps: forward takes the first in sorted order.
    assert_eq!(col_i64(&rows, "v"), vec![Some(1), None]);
    Ok(())
}

#[test]
fn nearest_tie_resolves_to_earlier_reference() -> TestResult {
    let tmp = TempDir::new()?;
    let table = assets_like(&tmp);
    seed(
        &table,
        2021,
        &[day(2021, 1, 11), day(2021, 1, 12), day(2021, 1, 10)],
        &["A", "A", "A"],
    )?;

    let reference = batch(vec![
        ("barrid", strs(&["A", "A"])),
        ("start_date", dates(&[day(2021, 1, 21), day(2021, 1, 1)])),
        ("v", ints(&[Some(21), Some(1)])),
    ]);
    let spec = AsOfSpec::new("date", "start_date")
        .with_by(["barrid"])
        .with_strategy(AsOfStrategy::Nearest);

    // Running twice gives the same answer.
    for _ in 0..2 {
        table.update_asof(2021, reference.clone(), spec.clone())?;
        let rows = table.read(Some(2021))?.collect()?;
        assert_eq!(
            col_date(&rows, "date"),
            vec![
                Some(day(2021, 1, 10)),
                Some(day(2021, 1, 11)),
                Some(day(2021, 1, 12))
            ]
        );
        // Jan 11 is ten days from both references.
        assert_eq!(col_i64(&rows, "v"), vec![Some(1), Some(1), Some(21)]);
    }
    Ok(())
}

#[test]
fn discard_set_and_right_on_never_reach_the_partition() -> TestResult {
    let tmp = TempDir::new()?;
    let table = assets_like(&tmp);
    seed(&table, 2021, &[day(2021, 2, 1), day(2021, 2, 1)], &["A", "B"])?;

    let mapping = batch(vec![
        ("barrid", strs(&["B", "A"])),
        ("start_date", dates(&[day(2020, 1, 1), day(2020, 7, 1)])),
        ("end_date", dates(&[day(2030, 1, 1), day(2030, 1, 1)])),
        ("cusip", opt_strs(&[Some("CUSIP_B"), Some("CUSIP_A")])),
        ("isin", opt_strs(&[Some("US_B"), None])),
    ]);
    let spec = AsOfSpec::new("date", "start_date")
        .with_by(["barrid"])
        .with_drop_right_cols(["end_date"]);
    table.update_asof(2021, mapping, spec)?;

    let rows = table.read(Some(2021))?.collect()?;
    assert_eq!(
        column_names(&rows),
        ["barrid", "date", "cusip", "price", "isin"]
    );
    assert_eq!(
        col_str(&rows, "cusip"),
        vec![Some("CUSIP_A".to_string()), Some("CUSIP_B".to_string())]
    );
    assert_eq!(col_f64(&rows, "price"), vec![Some(0.0), Some(1.0)]);
    assert_eq!(col_str(&rows, "isin"), vec![None, Some("US_B".to_string())]);
    Ok(())
}

#[test]
fn null_reference_values_do_not_overwrite() -> TestResult {
    let tmp = TempDir::new()?;
    let table = assets_like(&tmp);
    seed(&table, 2021, &[day(2021, 2, 1)], &["A"])?;
    table.update_asof(
        2021,
        batch(vec![
            ("barrid", strs(&["A"])),
            ("start_date", dates(&[day(2020, 1, 1)])),
            ("cusip", opt_strs(&[Some("FIRST")])),
        ]),
        AsOfSpec::new("date", "start_date").with_by(["barrid"]),
    )?;
    table.update_asof(
        2021,
        batch(vec![
            ("barrid", strs(&["A"])),
            ("start_date", dates(&[day(2021, 1, 1)])),
            ("cusip", opt_strs(&[None])),
        ]),
        AsOfSpec::new("date", "start_date").with_by(["barrid"]),
    )?;

    let rows = table.read(Some(2021))?.collect()?;
    assert_eq!(col_str(&rows, "cusip"), vec![Some("FIRST".to_string())]);
    Ok(())
}

#[test]
fn invalid_as_of_requests_leave_partition_untouched() -> TestResult {
    let tmp = TempDir::new()?;
    let table = assets_like(&tmp);
    seed(&table, 2021, &[day(2021, 2, 1)], &["A"])?;
    let path = table.partition_path(2021);
    let before = fs::read(&path)?;

    let reference = batch(vec![
        ("barrid", strs(&["A"])),
        ("start_date", dates(&[day(2021, 1, 1)])),
        ("v", ints(&[Some(1)])),
    ]);

    let err = table
        .update_asof(
            2021,
            reference.clone(),
            AsOfSpec::new("date", "start_date").with_by(["issuer"]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let err = table
        .update_asof(
            2021,
            reference.clone(),
            AsOfSpec::new("date", "effective").with_by(["barrid"]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);

    let int_times = batch(vec![
        ("barrid", strs(&["A"])),
        ("start_date", ints(&[Some(20_210_101)])),
    ]);
    let err = table
        .update_asof(
            2021,
            int_times,
            AsOfSpec::new("date", "start_date").with_by(["barrid"]),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);

    let err = table
        .update_asof(
            2021,
            reference,
            AsOfSpec::new("barrid", "start_date"),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Data);

    assert_eq!(fs::read(&path)?, before);
    Ok(())
}
