//! Database namespaces.
//!
//! A [`Database`] binds the fixed catalog to one namespace directory,
//! `<store_root>/<namespace>`. Construction never touches storage; a missing
//! or unreadable root surfaces as a storage error on first table use.

use std::{fmt, str::FromStr};

use crate::{
    catalog::{self, TABLE_NAMES},
    config::{ConfigError, DatabaseConfig, UnknownNamespaceSnafu},
    schema::TableSchema,
    storage::StorageLocation,
    table::{Table, TableOptions},
};

/// Isolated environment holding its own copy of every table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Research data.
    Research,
    /// Production data.
    Production,
    /// Scratch space for development.
    Development,
}

impl Namespace {
    /// Directory name of the namespace.
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Research => "research",
            Namespace::Production => "production",
            Namespace::Development => "development",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "research" => Ok(Namespace::Research),
            "production" => Ok(Namespace::Production),
            "development" => Ok(Namespace::Development),
            _ => UnknownNamespaceSnafu { value: s }.fail(),
        }
    }
}

/// The catalog of one namespace.
#[derive(Debug, Clone)]
pub struct Database {
    namespace: Namespace,
    config: DatabaseConfig,
    location: StorageLocation,
}

macro_rules! table_accessors {
    ($($name:ident),* $(,)?) => {
        $(
            #[doc = concat!("The `", stringify!($name), "` table.")]
            pub fn $name(&self) -> Table {
                self.bind(catalog::$name())
            }
        )*
    };
}

impl Database {
    /// Database for `namespace` under `store_root`. Never fails.
    pub fn new(namespace: Namespace, store_root: impl Into<std::path::PathBuf>) -> Self {
        Self::with_config(namespace, DatabaseConfig::new(store_root))
    }

    /// Database for `namespace` with explicit settings.
    pub fn with_config(namespace: Namespace, config: DatabaseConfig) -> Self {
        let location = StorageLocation::local(config.store_root()).child(namespace.as_str());
        Self {
            namespace,
            config,
            location,
        }
    }

    /// Database for `namespace`, rooted where the environment points.
    pub fn from_env(namespace: Namespace) -> Result<Self, ConfigError> {
        Ok(Self::with_config(namespace, DatabaseConfig::from_env()?))
    }

    /// Namespace of this database.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Settings shared by every table.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Root directory of this namespace.
    pub fn location(&self) -> &StorageLocation {
        &self.location
    }

    /// Names of every table in the catalog.
    pub fn table_names(&self) -> &'static [&'static str] {
        &TABLE_NAMES
    }

    /// Look up a catalog table by name.
    pub fn table(&self, name: &str) -> Option<Table> {
        catalog::table_schema(name).map(|schema| self.bind(schema))
    }

    fn bind(&self, schema: TableSchema) -> Table {
        let options = TableOptions {
            routing: self.config.routing(),
            compression: self.config.compression(),
        };
        Table::new(self.location.clone(), schema).with_options(options)
    }

    table_accessors!(
        assets,
        exposures,
        covariances,
        crsp_events,
        crsp_monthly,
        crsp_daily,
        factors,
        signals,
        active_weights,
        composite_alphas,
    );
}
