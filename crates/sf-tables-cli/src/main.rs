//! CLI tool for inspecting and maintaining the partitioned table store.

mod error;

use std::path::{Path, PathBuf};

use arrow::{array::RecordBatch, util::pretty::pretty_format_batches};
use clap::{Parser, Subcommand};
use log::debug;
use sf_tables_core::{
    AsOfSpec, AsOfStrategy, Database, DatabaseConfig, MergeReport, Namespace,
    PartitionCompression, Table, YearRouting, read_parquet_file,
};
use snafu::{OptionExt, ResultExt};

use crate::error::{
    CliResult, ConfigSnafu, InitSnafu, InputSnafu, MergeSnafu, ReadSnafu, RenderSnafu,
    UnknownTableSnafu,
};

#[derive(Debug, Subcommand)]
enum Command {
    /// List the tables of the catalog
    Tables,

    /// Create an empty partition if it does not exist yet
    Init {
        #[arg(long)]
        table: String,

        #[arg(long)]
        year: i32,
    },

    /// Print whether a partition exists
    Exists {
        #[arg(long)]
        table: String,

        #[arg(long)]
        year: i32,
    },

    /// Print the declared schema and the stored years of a table
    Schema {
        #[arg(long)]
        table: String,
    },

    /// Print rows of one partition, or of every partition when --year is omitted
    Show {
        #[arg(long)]
        table: String,

        #[arg(long)]
        year: Option<i32>,

        /// Repeatable column names (default: all columns)
        #[arg(long = "column")]
        columns: Vec<String>,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Full-outer merge of a Parquet file into a partition on the primary key
    Upsert {
        #[arg(long)]
        table: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        input: PathBuf,
    },

    /// Left merge of a Parquet file into a partition
    Update {
        #[arg(long)]
        table: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        input: PathBuf,

        /// Repeatable join columns (default: the primary key)
        #[arg(long = "on")]
        on: Vec<String>,
    },

    /// Attach the nearest-in-time rows of a Parquet file to a partition
    Asof {
        #[arg(long)]
        table: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        input: PathBuf,

        #[arg(long = "left-on")]
        left_on: String,

        #[arg(long = "right-on")]
        right_on: String,

        /// Repeatable grouping columns
        #[arg(long = "by")]
        by: Vec<String>,

        /// backward, forward or nearest
        #[arg(long, default_value_t = AsOfStrategy::Backward)]
        strategy: AsOfStrategy,

        /// Repeatable incoming columns to drop before merging
        #[arg(long = "drop")]
        drop: Vec<String>,
    },
}

/// Inspect and maintain the yearly Parquet partitions of the table store.
#[derive(Debug, Parser)]
#[command(name = "sftables")]
struct Cli {
    /// Store root (default: SF_TABLES_ROOT, else derived from ROOT)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// research, production or development
    #[arg(long, global = true, default_value = "research")]
    namespace: Namespace,

    /// Reject upserts whose rows fall outside the target year
    #[arg(long, global = true, default_value_t = false)]
    strict: bool,

    /// zstd, snappy or none
    #[arg(long, global = true, default_value_t = PartitionCompression::Zstd)]
    compression: PartitionCompression,

    #[command(subcommand)]
    cmd: Command,
}

fn open_database(cli: &Cli) -> CliResult<Database> {
    let config = match &cli.root {
        Some(root) => DatabaseConfig::new(root),
        None => DatabaseConfig::from_env().context(ConfigSnafu)?,
    };
    let routing = if cli.strict {
        YearRouting::Strict
    } else {
        YearRouting::Trust
    };
    let config = config
        .with_routing(routing)
        .with_compression(cli.compression);

    debug!(
        "store root {}, namespace {}",
        config.store_root().display(),
        cli.namespace
    );
    Ok(Database::with_config(cli.namespace, config))
}

fn lookup(db: &Database, name: &str) -> CliResult<Table> {
    db.table(name).context(UnknownTableSnafu { name })
}

fn read_input(path: &Path) -> CliResult<RecordBatch> {
    read_parquet_file(path).context(InputSnafu { path })
}

fn print_report(report: &MergeReport) {
    println!("Merged {report}");
}

fn cmd_tables(db: &Database) -> CliResult<()> {
    for name in db.table_names() {
        println!("{name}");
    }
    Ok(())
}

fn cmd_init(table: &Table, year: i32) -> CliResult<()> {
    let created = table.create_if_not_exists(year).context(InitSnafu {
        table: table.name(),
        year,
    })?;

    let path = table.partition_path(year);
    if created {
        println!("Created {}", path.display());
    } else {
        println!("Already exists: {}", path.display());
    }
    Ok(())
}

fn cmd_schema(table: &Table) -> CliResult<()> {
    let years = table.years().context(ReadSnafu {
        table: table.name(),
    })?;

    println!("{}", table.schema());
    if years.is_empty() {
        println!("years: none");
    } else {
        let years: Vec<String> = years.iter().map(i32::to_string).collect();
        println!("years: {}", years.join(", "));
    }
    Ok(())
}

fn cmd_show(table: &Table, year: Option<i32>, columns: Vec<String>, limit: usize) -> CliResult<()> {
    let ctx = || ReadSnafu {
        table: table.name(),
    };

    let mut scan = table.read(year).context(ctx())?;
    if !columns.is_empty() {
        scan = scan.select(columns).context(ctx())?;
    }

    let total = scan.num_rows();
    let mut shown: Vec<RecordBatch> = Vec::new();
    let mut buffered = 0;
    for batch in scan.batches() {
        if buffered >= limit {
            break;
        }
        let batch = batch.context(ctx())?;
        let take = batch.num_rows().min(limit - buffered);
        buffered += take;
        shown.push(batch.slice(0, take));
    }
    if shown.is_empty() {
        shown.push(RecordBatch::new_empty(scan.schema()));
    }

    let rendered = pretty_format_batches(&shown).context(RenderSnafu)?;
    println!("{rendered}");
    println!("{buffered} of {total} rows");
    Ok(())
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let db = open_database(&cli)?;

    match cli.cmd {
        Command::Tables => cmd_tables(&db),

        Command::Init { table, year } => cmd_init(&lookup(&db, &table)?, year),

        Command::Exists { table, year } => {
            println!("{}", lookup(&db, &table)?.exists(year));
            Ok(())
        }

        Command::Schema { table } => cmd_schema(&lookup(&db, &table)?),

        Command::Show {
            table,
            year,
            columns,
            limit,
        } => cmd_show(&lookup(&db, &table)?, year, columns, limit),

        Command::Upsert { table, year, input } => {
            let table = lookup(&db, &table)?;
            let rows = read_input(&input)?;
            let report = table.upsert(year, rows).context(MergeSnafu {
                table: table.name(),
                year,
            })?;
            print_report(&report);
            Ok(())
        }

        Command::Update {
            table,
            year,
            input,
            on,
        } => {
            let table = lookup(&db, &table)?;
            let rows = read_input(&input)?;
            let on: Vec<&str> = on.iter().map(String::as_str).collect();
            let on = (!on.is_empty()).then_some(on.as_slice());
            let report = table.update(year, rows, on).context(MergeSnafu {
                table: table.name(),
                year,
            })?;
            print_report(&report);
            Ok(())
        }

        Command::Asof {
            table,
            year,
            input,
            left_on,
            right_on,
            by,
            strategy,
            drop,
        } => {
            let table = lookup(&db, &table)?;
            let rows = read_input(&input)?;
            let spec = AsOfSpec::new(left_on, right_on)
                .with_by(by)
                .with_strategy(strategy)
                .with_drop_right_cols(drop);
            let report = table.update_asof(year, rows, spec).context(MergeSnafu {
                table: table.name(),
                year,
            })?;
            print_report(&report);
            Ok(())
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
