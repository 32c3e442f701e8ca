use std::path::PathBuf;

use arrow::error::ArrowError;
use sf_tables_core::{ConfigError, TableError};
use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display(
        "No store root given. Pass --root or set SF_TABLES_ROOT (or ROOT): {source}"
    ))]
    Config { source: ConfigError },

    #[snafu(display("Unknown table '{name}'. Run `sftables tables` to list the catalog."))]
    UnknownTable { name: String },

    #[snafu(display("Failed to create partition {year} of {table}: {source}"))]
    Init {
        table: String,
        year: i32,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Failed to read {table}: {source}"))]
    Read {
        table: String,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Failed to read input parquet {}: {source}", path.display()))]
    Input {
        path: PathBuf,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display(
        "Merge into {table} {year} failed ({}): {source}. The partition was left unchanged.",
        source.kind()
    ))]
    Merge {
        table: String,
        year: i32,
        #[snafu(source(from(TableError, Box::new)))]
        source: Box<TableError>,
    },

    #[snafu(display("Failed to render result: {source}"))]
    Render { source: ArrowError },
}
