//! Store configuration and root resolution.
//!
//! The store root is normally taken from the environment:
//!
//! - `SF_TABLES_ROOT`, used verbatim when set;
//! - otherwise `ROOT`, whose first two path components (`/<home>/<user>`)
//!   locate the shared database under
//!   `/<home>/<user>/groups/grp_quant/database`.

use std::{fmt, path::PathBuf, str::FromStr};

use parquet::{
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};
use snafu::prelude::*;

/// Environment variable holding an explicit store root.
pub const STORE_ROOT_ENV: &str = "SF_TABLES_ROOT";

/// Environment variable holding a user's archive root (`/<home>/<user>/…`).
pub const USER_ROOT_ENV: &str = "ROOT";

/// Directory of the shared database relative to `/<home>/<user>`.
pub const SHARED_DATABASE_DIR: &str = "groups/grp_quant/database";

/// Errors raised while resolving configuration.
#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// Neither root variable is set.
    #[snafu(display("Neither {STORE_ROOT_ENV} nor {USER_ROOT_ENV} is set; cannot locate the store"))]
    RootNotSet,

    /// `ROOT` does not start with `/<home>/<user>`.
    #[snafu(display("{USER_ROOT_ENV}={value} is not of the form /<home>/<user>/..."))]
    MalformedRoot {
        /// Value found in the environment.
        value: String,
    },

    /// A namespace name is not recognised.
    #[snafu(display(
        "Unknown namespace '{value}' (expected research, production or development)"
    ))]
    UnknownNamespace {
        /// Value supplied.
        value: String,
    },

    /// A compression name is not recognised.
    #[snafu(display("Unknown compression '{value}' (expected zstd, snappy or none)"))]
    UnknownCompression {
        /// Value supplied.
        value: String,
    },
}

/// Whether merges verify that incoming rows belong to the target year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum YearRouting {
    /// Callers route rows; nothing is checked.
    #[default]
    Trust,
    /// Upserts reject rows whose partition column is null or falls in
    /// another year.
    Strict,
}

/// Compression codec for partition files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartitionCompression {
    /// No compression.
    Uncompressed,
    /// Snappy.
    Snappy,
    /// Zstandard at the default level.
    #[default]
    Zstd,
}

impl PartitionCompression {
    /// Parquet writer properties using this codec.
    pub fn writer_properties(self) -> WriterProperties {
        let compression = match self {
            PartitionCompression::Uncompressed => Compression::UNCOMPRESSED,
            PartitionCompression::Snappy => Compression::SNAPPY,
            PartitionCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
        };
        WriterProperties::builder()
            .set_compression(compression)
            .build()
    }
}

impl FromStr for PartitionCompression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(PartitionCompression::Uncompressed),
            "snappy" => Ok(PartitionCompression::Snappy),
            "zstd" => Ok(PartitionCompression::Zstd),
            _ => UnknownCompressionSnafu { value: s }.fail(),
        }
    }
}

impl fmt::Display for PartitionCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PartitionCompression::Uncompressed => "none",
            PartitionCompression::Snappy => "snappy",
            PartitionCompression::Zstd => "zstd",
        };
        f.write_str(s)
    }
}

/// Settings shared by every table of a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    store_root: PathBuf,
    routing: YearRouting,
    compression: PartitionCompression,
}

impl DatabaseConfig {
    /// Configuration rooted at `store_root` with default settings.
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        Self {
            store_root: store_root.into(),
            routing: YearRouting::default(),
            compression: PartitionCompression::default(),
        }
    }

    /// Resolve the store root from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        resolve_store_root(|key| std::env::var(key).ok()).map(Self::new)
    }

    /// Set the year routing policy.
    pub fn with_routing(mut self, routing: YearRouting) -> Self {
        self.routing = routing;
        self
    }

    /// Set the partition compression codec.
    pub fn with_compression(mut self, compression: PartitionCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Directory holding every namespace.
    pub fn store_root(&self) -> &PathBuf {
        &self.store_root
    }

    /// Year routing policy.
    pub fn routing(&self) -> YearRouting {
        self.routing
    }

    /// Partition compression codec.
    pub fn compression(&self) -> PartitionCompression {
        self.compression
    }
}

/// Resolve the store root from variables provided by `lookup`.
pub fn resolve_store_root<F>(lookup: F) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup(STORE_ROOT_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    let value = lookup(USER_ROOT_ENV)
        .filter(|v| !v.is_empty())
        .context(RootNotSetSnafu)?;

    let mut parts = value.strip_prefix('/').unwrap_or("").split('/');
    match (parts.next(), parts.next()) {
        (Some(home), Some(user)) if !home.is_empty() && !user.is_empty() => {
            Ok(PathBuf::from(format!("/{home}/{user}/{SHARED_DATABASE_DIR}")))
        }
        _ => MalformedRootSnafu { value }.fail(),
    }
}
