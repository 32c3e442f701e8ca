//! Key encoding and row matching for keyed merges.
//!
//! Key tuples are encoded with Arrow's row format so composite keys of any
//! supported type hash and compare as plain bytes.

use std::collections::HashMap;

use arrow::{
    array::{Array, ArrayRef},
    row::{RowConverter, Rows, SortField},
};
use snafu::ResultExt;

use super::error::{ArrowSnafu, DuplicateKeySnafu, MergeResult, NullKeySnafu};

/// Outcome of matching local keys against incoming keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyMatch {
    /// For every local row, the incoming row carrying the same key.
    pub(crate) local_to_incoming: Vec<Option<usize>>,
    /// Incoming rows whose key is absent locally, in incoming order.
    pub(crate) unmatched_incoming: Vec<usize>,
}

/// Encode the given key columns into comparable rows.
pub(crate) fn encode(columns: &[ArrayRef]) -> MergeResult<Rows> {
    let fields = columns
        .iter()
        .map(|c| SortField::new(c.data_type().clone()))
        .collect();
    let converter = RowConverter::new(fields).context(ArrowSnafu)?;
    converter.convert_columns(columns).context(ArrowSnafu)
}

/// Reject incoming key columns holding any null value.
pub(crate) fn ensure_no_null_keys(names: &[String], columns: &[ArrayRef]) -> MergeResult<()> {
    for (name, column) in names.iter().zip(columns) {
        if column.null_count() == 0 {
            continue;
        }
        if let Some(row) = (0..column.len()).find(|&i| column.is_null(i)) {
            return NullKeySnafu {
                column: name.clone(),
                row,
            }
            .fail();
        }
    }
    Ok(())
}

/// Match every local row to the incoming row with the same key.
///
/// Incoming keys must be unique and non-null. Both column lists must be in
/// the same key order with identical types.
pub(crate) fn match_keys(
    names: &[String],
    local: &[ArrayRef],
    incoming: &[ArrayRef],
) -> MergeResult<KeyMatch> {
    ensure_no_null_keys(names, incoming)?;

    let mut all: Vec<ArrayRef> = Vec::with_capacity(local.len());
    for (l, r) in local.iter().zip(incoming) {
        all.push(super::coalesce::append(l, r)?);
    }
    // One converter over both sides so equal keys encode identically.
    let rows = encode(&all)?;
    let local_len = local.first().map_or(0, |c| c.len());
    let incoming_len = incoming.first().map_or(0, |c| c.len());

    let mut index = HashMap::with_capacity(incoming_len);
    for i in 0..incoming_len {
        let row = rows.row(local_len + i);
        if let Some(first) = index.insert(row, i) {
            return DuplicateKeySnafu {
                columns: names.join(", "),
                first,
                second: i,
            }
            .fail();
        }
    }

    let mut seen = vec![false; incoming_len];
    let mut local_to_incoming = Vec::with_capacity(local_len);
    for i in 0..local_len {
        let hit = index.get(&rows.row(i)).copied();
        if let Some(j) = hit {
            seen[j] = true;
        }
        local_to_incoming.push(hit);
    }
    let unmatched_incoming = (0..incoming_len).filter(|&j| !seen[j]).collect();

    Ok(KeyMatch {
        local_to_incoming,
        unmatched_incoming,
    })
}
