//! Column-set algebra shared by every merge kind.

use std::collections::BTreeSet;

use arrow::datatypes::Schema;
use snafu::ensure;

use super::{
    asof::AsOfSpec,
    error::{EmptyKeysSnafu, MergeResult, MissingColumnSnafu, Side},
};

/// Partition of the columns involved in one merge.
///
/// Computed per call from the runtime schemas of both sides. `keys` keeps the
/// request order; every other list is sorted lexicographically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    keys: Vec<String>,
    overlap: Vec<String>,
    local_only: Vec<String>,
    right_only: Vec<String>,
    discarded: Vec<String>,
}

fn names(schema: &Schema) -> BTreeSet<&str> {
    schema.fields().iter().map(|f| f.name().as_str()).collect()
}

fn sorted(set: BTreeSet<&str>) -> Vec<String> {
    set.into_iter().map(str::to_string).collect()
}

fn require(schema: &Schema, column: &str, side: Side) -> MergeResult<()> {
    ensure!(
        schema.index_of(column).is_ok(),
        MissingColumnSnafu { column, side }
    );
    Ok(())
}

impl ColumnPlan {
    /// Plan for a keyed merge (upsert or update) on `keys`.
    ///
    /// Every key must exist on both sides.
    pub fn keyed(local: &Schema, incoming: &Schema, keys: &[String]) -> MergeResult<Self> {
        ensure!(!keys.is_empty(), EmptyKeysSnafu);
        for key in keys {
            require(local, key, Side::Local)?;
            require(incoming, key, Side::Incoming)?;
        }

        let l = names(local);
        let r = names(incoming);
        let k: BTreeSet<&str> = keys.iter().map(String::as_str).collect();

        Ok(Self {
            keys: dedup(keys.iter().map(String::as_str)),
            overlap: sorted(&(&l & &r) - &k),
            local_only: sorted(&(&l - &r) - &k),
            right_only: sorted(&(&r - &l) - &k),
            discarded: Vec::new(),
        })
    }

    /// Plan for an as-of merge.
    ///
    /// `by` columns must exist on both sides, `left_on` locally and
    /// `right_on` in the incoming batch. Discard-set names absent from the
    /// incoming schema are ignored.
    pub fn as_of(local: &Schema, incoming: &Schema, spec: &AsOfSpec) -> MergeResult<Self> {
        for col in spec.by() {
            require(local, col, Side::Local)?;
            require(incoming, col, Side::Incoming)?;
        }
        require(local, spec.left_on(), Side::Local)?;
        require(incoming, spec.right_on(), Side::Incoming)?;

        let l = names(local);
        let r = names(incoming);

        let mut discard: BTreeSet<&str> = spec
            .drop_right_cols()
            .iter()
            .map(String::as_str)
            .filter(|c| r.contains(c))
            .collect();
        discard.insert(spec.right_on());
        let keep = &r - &discard;

        let by: BTreeSet<&str> = spec.by().iter().map(String::as_str).collect();
        let mut k = by.clone();
        k.insert(spec.left_on());

        let keys = dedup(
            spec.by()
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(spec.left_on())),
        );

        Ok(Self {
            keys,
            overlap: sorted(&(&l & &keep) - &k),
            local_only: sorted(&(&l - &keep) - &k),
            right_only: sorted(&(&keep - &l) - &by),
            discarded: sorted(discard),
        })
    }

    /// Key columns: merge keys for a keyed merge, `by…` then `left_on` for
    /// an as-of merge.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Non-key columns present on both sides.
    pub fn overlap(&self) -> &[String] {
        &self.overlap
    }

    /// Non-key columns present only in the local partition.
    pub fn local_only(&self) -> &[String] {
        &self.local_only
    }

    /// Non-key columns present only in the incoming batch.
    pub fn right_only(&self) -> &[String] {
        &self.right_only
    }

    /// Incoming columns removed before the merge (discard set and the
    /// incoming temporal column).
    pub fn discarded(&self) -> &[String] {
        &self.discarded
    }
}

fn dedup<'a>(cols: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for c in cols {
        if !out.iter().any(|o| o == c) {
            out.push(c.to_string());
        }
    }
    out
}
