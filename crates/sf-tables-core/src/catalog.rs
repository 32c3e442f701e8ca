//! The fixed table catalog.
//!
//! Every database namespace exposes the same tables with the same schemas
//! and primary keys. Risk-model tables (`exposures`, `covariances`,
//! `factors`) carry one `Float64` column per factor in [`FACTORS`].

use crate::schema::{
    ColumnType::{self, Bool, Date, Float64, Int64, Utf8},
    TableSchema,
};

/// Column holding the observation date of every catalog table. Rows are
/// routed to partitions by its calendar year.
pub const DATE_COLUMN: &str = "date";

/// Names of every catalog table, in catalog order.
pub const TABLE_NAMES: [&str; 10] = [
    "assets",
    "exposures",
    "covariances",
    "crsp_events",
    "crsp_monthly",
    "crsp_daily",
    "factors",
    "signals",
    "active_weights",
    "composite_alphas",
];

/// Risk-model factors: style factors, the country factor, then industries.
pub const FACTORS: &[&str] = &[
    "USSLOWL_BETA",
    "USSLOWL_DIVYILD",
    "USSLOWL_EARNQLTY",
    "USSLOWL_EARNYILD",
    "USSLOWL_GROWTH",
    "USSLOWL_LEVERAGE",
    "USSLOWL_LIQUIDTY",
    "USSLOWL_LTREVRSL",
    "USSLOWL_MGMTQLTY",
    "USSLOWL_MIDCAP",
    "USSLOWL_MOMENTUM",
    "USSLOWL_PROFIT",
    "USSLOWL_PROSPECT",
    "USSLOWL_RESVOL",
    "USSLOWL_SIZE",
    "USSLOWL_VALUE",
    "USSLOWL_COUNTRY",
    "USSLOWL_AERODEF",
    "USSLOWL_AIRLINES",
    "USSLOWL_ALUMSTEL",
    "USSLOWL_APPAREL",
    "USSLOWL_AUTO",
    "USSLOWL_BANKS",
    "USSLOWL_BEVTOB",
    "USSLOWL_BIOLIFE",
    "USSLOWL_BLDGPROD",
    "USSLOWL_CHEM",
    "USSLOWL_CNSTENG",
    "USSLOWL_CNSTMACH",
    "USSLOWL_CNSTMATL",
    "USSLOWL_COMMEQP",
    "USSLOWL_COMPELEC",
    "USSLOWL_COMSVCS",
    "USSLOWL_CONGLOM",
    "USSLOWL_CONTAINR",
    "USSLOWL_DISTRIB",
    "USSLOWL_DIVFIN",
    "USSLOWL_ELECEQP",
    "USSLOWL_ELECUTIL",
    "USSLOWL_FOODPROD",
    "USSLOWL_FOODRET",
    "USSLOWL_GASUTIL",
    "USSLOWL_HLTHEQP",
    "USSLOWL_HLTHSVCS",
    "USSLOWL_HOMEBLDG",
    "USSLOWL_HOUSEDUR",
    "USSLOWL_INDMACH",
    "USSLOWL_INSURNCE",
    "USSLOWL_INTERNET",
    "USSLOWL_LEISPROD",
    "USSLOWL_LEISSVCS",
    "USSLOWL_LIFEINS",
    "USSLOWL_MEDIA",
    "USSLOWL_MGDHLTH",
    "USSLOWL_MULTUTIL",
    "USSLOWL_OILGSCON",
    "USSLOWL_OILGSDRL",
    "USSLOWL_OILGSEQP",
    "USSLOWL_OILGSEXP",
    "USSLOWL_PAPER",
    "USSLOWL_PHARMA",
    "USSLOWL_PRECMTLS",
    "USSLOWL_PSNLPROD",
    "USSLOWL_REALEST",
    "USSLOWL_RESTAUR",
    "USSLOWL_ROADRAIL",
    "USSLOWL_SEMICOND",
    "USSLOWL_SEMIEQP",
    "USSLOWL_SOFTWARE",
    "USSLOWL_SPLTYRET",
    "USSLOWL_SPTYCHEM",
    "USSLOWL_SPTYSTOR",
    "USSLOWL_TELECOM",
    "USSLOWL_TRADECO",
    "USSLOWL_TRANSPRT",
    "USSLOWL_WIRELESS",
];

fn declare(name: &str, leading: &[(&str, ColumnType)], factors: bool, keys: &[&str]) -> TableSchema {
    let mut columns: Vec<(String, ColumnType)> = leading
        .iter()
        .map(|(col, ty)| (col.to_string(), *ty))
        .collect();
    if factors {
        columns.extend(FACTORS.iter().map(|f| (f.to_string(), Float64)));
    }
    TableSchema::from_parts(
        name.to_string(),
        columns,
        keys.iter().map(|k| k.to_string()).collect(),
    )
    .with_partition_column_unchecked(DATE_COLUMN)
}

/// Declared schema of the catalog table `name`.
pub fn table_schema(name: &str) -> Option<TableSchema> {
    let schema = match name {
        "assets" => assets(),
        "exposures" => exposures(),
        "covariances" => covariances(),
        "crsp_events" => crsp_events(),
        "crsp_monthly" => crsp_monthly(),
        "crsp_daily" => crsp_daily(),
        "factors" => factors(),
        "signals" => signals(),
        "active_weights" => active_weights(),
        "composite_alphas" => composite_alphas(),
        _ => return None,
    };
    Some(schema)
}

/// Schema of the `assets` table.
pub fn assets() -> TableSchema {
    declare(
        "assets",
        &[
            ("date", Date),
            ("rootid", Utf8),
            ("barrid", Utf8),
            ("issuerid", Utf8),
            ("instrument", Utf8),
            ("name", Utf8),
            ("cusip", Utf8),
            ("ticker", Utf8),
            ("price", Float64),
            ("return", Float64),
            ("specific_return", Float64),
            ("market_cap", Float64),
            ("price_source", Utf8),
            ("currency", Utf8),
            ("iso_country_code", Utf8),
            ("iso_currency_code", Utf8),
            ("yield", Float64),
            ("total_risk", Float64),
            ("specific_risk", Float64),
            ("historical_beta", Float64),
            ("predicted_beta", Float64),
            ("russell_1000", Bool),
            ("russell_2000", Bool),
            ("in_universe", Bool),
            ("daily_volume", Float64),
            ("average_daily_volume_30", Float64),
            ("average_daily_volume_60", Float64),
            ("average_daily_volume_90", Float64),
            ("bid_ask_spread", Float64),
            ("average_daily_bid_ask_spread_30", Float64),
            ("average_daily_bid_ask_spread_60", Float64),
            ("average_daily_bid_ask_spread_90", Float64),
        ],
        false,
        &["date", "barrid"],
    )
}

/// Schema of the `exposures` table.
pub fn exposures() -> TableSchema {
    declare(
        "exposures",
        &[("date", Date), ("barrid", Utf8)],
        true,
        &["date", "barrid"],
    )
}

/// Schema of the `covariances` table.
pub fn covariances() -> TableSchema {
    declare(
        "covariances",
        &[("date", Date), ("factor_1", Utf8)],
        true,
        &["date", "factor_1"],
    )
}

/// Schema of the `crsp_events` table.
pub fn crsp_events() -> TableSchema {
    declare(
        "crsp_events",
        &[
            ("date", Date),
            ("permno", Int64),
            ("ticker", Utf8),
            ("shrcd", Int64),
            ("exchcd", Int64),
        ],
        false,
        &["date", "permno"],
    )
}

/// Schema of the `crsp_monthly` table.
pub fn crsp_monthly() -> TableSchema {
    declare(
        "crsp_monthly",
        &[
            ("date", Date),
            ("permno", Int64),
            ("cusip", Utf8),
            ("ret", Float64),
            ("retx", Float64),
            ("prc", Float64),
            ("vol", Int64),
            ("shrout", Int64),
        ],
        false,
        &["date", "permno"],
    )
}

/// Schema of the `crsp_daily` table.
pub fn crsp_daily() -> TableSchema {
    declare(
        "crsp_daily",
        &[
            ("date", Date),
            ("permno", Int64),
            ("cusip", Utf8),
            ("ret", Float64),
            ("retx", Float64),
            ("prc", Float64),
            ("vol", Int64),
            ("openprc", Float64),
            ("askhi", Float64),
            ("bidlo", Float64),
            ("shrout", Int64),
        ],
        false,
        &["date", "permno"],
    )
}

/// Schema of the `factors` table.
pub fn factors() -> TableSchema {
    declare("factors", &[("date", Date)], true, &["date"])
}

/// Schema of the `signals` table.
pub fn signals() -> TableSchema {
    declare(
        "signals",
        &[
            ("date", Date),
            ("barrid", Utf8),
            ("name", Utf8),
            ("signal", Float64),
            ("score", Float64),
            ("alpha", Float64),
        ],
        false,
        &["date", "barrid", "name"],
    )
}

/// Schema of the `active_weights` table.
pub fn active_weights() -> TableSchema {
    declare(
        "active_weights",
        &[
            ("date", Date),
            ("barrid", Utf8),
            ("signal", Utf8),
            ("weight", Float64),
        ],
        false,
        &["date", "barrid", "signal"],
    )
}

/// Schema of the `composite_alphas` table.
pub fn composite_alphas() -> TableSchema {
    declare(
        "composite_alphas",
        &[
            ("date", Date),
            ("barrid", Utf8),
            ("name", Utf8),
            ("alpha", Float64),
        ],
        false,
        &["date", "barrid", "name"],
    )
}
