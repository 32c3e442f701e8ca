//! Column conflict resolution.

use arrow::{
    array::{Array, ArrayRef, UInt64Array, new_null_array},
    compute::{self, kernels::boolean::is_not_null, kernels::zip::zip},
    datatypes::DataType,
};
use snafu::ResultExt;

use super::error::{ArrowSnafu, MergeResult};

/// Bring an incoming column to `target`'s type.
///
/// Returns `None` when the types differ, except that an all-null column of
/// type `Null` becomes a null column of the target type.
pub(crate) fn conform(incoming: &ArrayRef, target: &DataType) -> Option<ArrayRef> {
    if incoming.data_type() == target {
        Some(incoming.clone())
    } else if incoming.data_type() == &DataType::Null {
        Some(new_null_array(target, incoming.len()))
    } else {
        None
    }
}

/// Gather `values[i]` for every index; a `None` index yields null.
pub(crate) fn gather(values: &ArrayRef, indices: &[Option<usize>]) -> MergeResult<ArrayRef> {
    let indices: UInt64Array = indices.iter().map(|i| i.map(|i| i as u64)).collect();
    compute::take(values.as_ref(), &indices, None).context(ArrowSnafu)
}

/// Per-row choice of the incoming value when it is non-null, else the local
/// value. `incoming` and `local` must have equal length and type.
pub(crate) fn coalesce(incoming: &ArrayRef, local: &ArrayRef) -> MergeResult<ArrayRef> {
    if incoming.null_count() == incoming.len() {
        return Ok(local.clone());
    }
    if incoming.null_count() == 0 {
        return Ok(incoming.clone());
    }
    let mask = is_not_null(incoming.as_ref()).context(ArrowSnafu)?;
    zip(&mask, incoming, local).context(ArrowSnafu)
}

/// Concatenate two column segments of the same type.
pub(crate) fn append(head: &ArrayRef, tail: &ArrayRef) -> MergeResult<ArrayRef> {
    if tail.is_empty() {
        return Ok(head.clone());
    }
    if head.is_empty() {
        return Ok(tail.clone());
    }
    compute::concat(&[head.as_ref(), tail.as_ref()]).context(ArrowSnafu)
}
