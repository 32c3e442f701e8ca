//! Keyed merges: full-outer upsert and left update.

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, new_null_array};
use log::{debug, warn};
use snafu::{OptionExt, ResultExt};

use super::{
    coalesce::{append, coalesce, conform, gather},
    error::{ArrowSnafu, KeyTypeMismatchSnafu, MergeResult, TypeMismatchSnafu},
    keys::match_keys,
    plan::ColumnPlan,
};
use crate::schema::nullable_schema;

/// Whether unmatched incoming keys are inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyedMode {
    /// Full outer: insert incoming-only keys after the local rows.
    Upsert,
    /// Left: incoming-only keys are dropped.
    Update,
}

/// Merge `incoming` into `local` on `keys`.
///
/// The result keeps the local schema and row order; with
/// [`KeyedMode::Upsert`] new keys follow in incoming order.
pub(crate) fn merge_keyed(
    local: &RecordBatch,
    incoming: &RecordBatch,
    keys: &[String],
    mode: KeyedMode,
) -> MergeResult<(RecordBatch, ColumnPlan)> {
    let local_schema = local.schema();
    let incoming_schema = incoming.schema();
    let plan = ColumnPlan::keyed(&local_schema, &incoming_schema, keys)?;
    debug!(
        "{mode:?} plan: keys={:?} overlap={:?} local_only={:?} right_only={:?}",
        plan.keys(),
        plan.overlap(),
        plan.local_only(),
        plan.right_only()
    );
    if !plan.right_only().is_empty() {
        warn!(
            "discarding incoming columns not in the stored partition: {:?}",
            plan.right_only()
        );
    }

    // Incoming columns that take part in the merge, conformed to local types.
    let mut incoming_cols: Vec<(&str, ArrayRef)> = Vec::new();
    for (name, is_key) in plan
        .keys()
        .iter()
        .map(|k| (k, true))
        .chain(plan.overlap().iter().map(|c| (c, false)))
    {
        let local_type = local_schema
            .field_with_name(name)
            .context(ArrowSnafu)?
            .data_type();
        let idx = incoming_schema.index_of(name).context(ArrowSnafu)?;
        let original = incoming.column(idx);
        let conformed = if is_key {
            conform(original, local_type).context(KeyTypeMismatchSnafu {
                column: name.as_str(),
                local: local_type.clone(),
                incoming: original.data_type().clone(),
            })?
        } else {
            conform(original, local_type).context(TypeMismatchSnafu {
                column: name.as_str(),
                local: local_type.clone(),
                incoming: original.data_type().clone(),
            })?
        };
        incoming_cols.push((name.as_str(), conformed));
    }
    let incoming_col = |name: &str| {
        incoming_cols
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c.clone())
    };

    let local_keys = plan
        .keys()
        .iter()
        .map(|k| -> MergeResult<ArrayRef> {
            let idx = local_schema.index_of(k).context(ArrowSnafu)?;
            Ok(local.column(idx).clone())
        })
        .collect::<MergeResult<Vec<_>>>()?;
    let incoming_keys: Vec<ArrayRef> = plan.keys().iter().filter_map(|k| incoming_col(k)).collect();

    let matched = match_keys(plan.keys(), &local_keys, &incoming_keys)?;
    let inserted: Vec<Option<usize>> = match mode {
        KeyedMode::Upsert => matched.unmatched_incoming.iter().map(|&i| Some(i)).collect(),
        KeyedMode::Update => Vec::new(),
    };
    debug!(
        "{mode:?}: {} local rows, {} matched, {} inserted",
        local.num_rows(),
        matched.local_to_incoming.iter().filter(|m| m.is_some()).count(),
        inserted.len()
    );

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(local.num_columns());
    for (field, local_values) in local_schema.fields().iter().zip(local.columns()) {
        let name = field.name().as_str();
        let is_key = plan.keys().iter().any(|k| k == name);

        let column = match incoming_col(name) {
            Some(incoming_values) => {
                let head = if is_key {
                    local_values.clone()
                } else {
                    let matched_values = gather(&incoming_values, &matched.local_to_incoming)?;
                    coalesce(&matched_values, local_values)?
                };
                let tail = gather(&incoming_values, &inserted)?;
                append(&head, &tail)?
            }
            // Local-only: inserted rows carry nulls.
            None => append(
                local_values,
                &new_null_array(field.data_type(), inserted.len()),
            )?,
        };
        columns.push(column);
    }

    let schema = Arc::new(nullable_schema(&local_schema));
    let batch = RecordBatch::try_new(schema, columns).context(ArrowSnafu)?;
    Ok((batch, plan))
}
