//! Temporal (as-of) merge.
//!
//! Each local row is matched, within its `by` group, to one incoming row
//! chosen by [`AsOfStrategy`]. Both sides are sorted by `(by…, temporal)`
//! before matching; the original row number breaks ties so the sort, and
//! therefore the match, is deterministic.

use std::{collections::HashMap, fmt, str::FromStr, sync::Arc};

use arrow::{
    array::{Array, ArrayRef, RecordBatch, UInt64Array},
    compute::{self, SortColumn, SortOptions},
    datatypes::{Field, Schema},
};
use log::debug;
use snafu::{OptionExt, ResultExt, ensure};

use super::{
    coalesce::{coalesce, conform, gather},
    error::{
        ArrowSnafu, KeyTypeMismatchSnafu, MergeError, MergeResult, TemporalSnafu,
        TemporalTypeMismatchSnafu, TypeMismatchSnafu,
    },
    keys::encode,
    plan::ColumnPlan,
};
use crate::temporal::{TemporalError, is_orderable_temporal, temporal_values};

/// How an incoming row is chosen for a local timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AsOfStrategy {
    /// Latest incoming timestamp at or before the local one.
    #[default]
    Backward,
    /// Earliest incoming timestamp at or after the local one.
    Forward,
    /// Smallest absolute distance; equidistant candidates resolve to the
    /// backward one.
    Nearest,
}

impl fmt::Display for AsOfStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AsOfStrategy::Backward => "backward",
            AsOfStrategy::Forward => "forward",
            AsOfStrategy::Nearest => "nearest",
        };
        f.write_str(s)
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrategyError(String);

impl fmt::Display for ParseStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown as-of strategy '{}' (expected backward, forward or nearest)",
            self.0
        )
    }
}

impl std::error::Error for ParseStrategyError {}

impl FromStr for AsOfStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backward" => Ok(AsOfStrategy::Backward),
            "forward" => Ok(AsOfStrategy::Forward),
            "nearest" => Ok(AsOfStrategy::Nearest),
            _ => Err(ParseStrategyError(s.to_string())),
        }
    }
}

/// Parameters of an as-of merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsOfSpec {
    left_on: String,
    right_on: String,
    by: Vec<String>,
    strategy: AsOfStrategy,
    drop_right_cols: Vec<String>,
}

impl AsOfSpec {
    /// Match local `left_on` against incoming `right_on`, backward, with no
    /// grouping and no discarded columns.
    pub fn new(left_on: impl Into<String>, right_on: impl Into<String>) -> Self {
        Self {
            left_on: left_on.into(),
            right_on: right_on.into(),
            by: Vec::new(),
            strategy: AsOfStrategy::default(),
            drop_right_cols: Vec::new(),
        }
    }

    /// Group rows by these columns; matches never cross groups.
    pub fn with_by<I>(mut self, by: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.by = by.into_iter().map(Into::into).collect();
        self
    }

    /// Select the matching strategy.
    pub fn with_strategy(mut self, strategy: AsOfStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Incoming columns to drop before the merge.
    pub fn with_drop_right_cols<I>(mut self, cols: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.drop_right_cols = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Local temporal column.
    pub fn left_on(&self) -> &str {
        &self.left_on
    }

    /// Incoming temporal column.
    pub fn right_on(&self) -> &str {
        &self.right_on
    }

    /// Grouping columns.
    pub fn by(&self) -> &[String] {
        &self.by
    }

    /// Matching strategy.
    pub fn strategy(&self) -> AsOfStrategy {
        self.strategy
    }

    /// Incoming columns discarded unconditionally.
    pub fn drop_right_cols(&self) -> &[String] {
        &self.drop_right_cols
    }
}

/// Pick the candidate for `t` from `times`, sorted ascending.
///
/// Among equal candidate times, backward takes the last and forward the
/// first. Returns a position in `times`.
pub fn find_match(times: &[i64], t: i64, strategy: AsOfStrategy) -> Option<usize> {
    let backward = || {
        let p = times.partition_point(|&x| x <= t);
        p.checked_sub(1)
    };
    let forward = || {
        let p = times.partition_point(|&x| x < t);
        (p < times.len()).then_some(p)
    };

    match strategy {
        AsOfStrategy::Backward => backward(),
        AsOfStrategy::Forward => forward(),
        AsOfStrategy::Nearest => match (backward(), forward()) {
            (Some(b), Some(f)) => {
                if times[f].abs_diff(t) < times[b].abs_diff(t) {
                    Some(f)
                } else {
                    Some(b)
                }
            }
            (b, f) => b.or(f),
        },
    }
}

/// Rows of `batch` in `(cols…, row number)` ascending order.
fn sort_batch(batch: &RecordBatch, cols: &[&str]) -> MergeResult<RecordBatch> {
    if batch.num_rows() < 2 {
        return Ok(batch.clone());
    }

    let row_numbers: ArrayRef = Arc::new(UInt64Array::from_iter_values(0..batch.num_rows() as u64));
    let mut sort_columns: Vec<SortColumn> = Vec::with_capacity(cols.len() + 1);
    for col in cols {
        if let Some(values) = batch.column_by_name(col) {
            sort_columns.push(SortColumn {
                values: values.clone(),
                options: Some(SortOptions::default()),
            });
        }
    }
    sort_columns.push(SortColumn {
        values: row_numbers,
        options: None,
    });

    let indices = compute::lexsort_to_indices(&sort_columns, None).context(ArrowSnafu)?;
    let columns = batch
        .columns()
        .iter()
        .map(|c| compute::take(c.as_ref(), &indices, None))
        .collect::<Result<Vec<_>, _>>()
        .context(ArrowSnafu)?;
    RecordBatch::try_new(batch.schema(), columns).context(ArrowSnafu)
}

fn column(batch: &RecordBatch, name: &str) -> MergeResult<ArrayRef> {
    let idx = batch.schema().index_of(name).context(ArrowSnafu)?;
    Ok(batch.column(idx).clone())
}

/// Group id of every row, or `None` when any grouping value is null.
///
/// Ids are shared between the two sides: equal `by` tuples get equal ids.
fn group_ids(
    local_by: &[ArrayRef],
    incoming_by: &[ArrayRef],
    local_len: usize,
    incoming_len: usize,
) -> MergeResult<(Vec<Option<usize>>, Vec<Option<usize>>)> {
    if local_by.is_empty() {
        return Ok((vec![Some(0); local_len], vec![Some(0); incoming_len]));
    }

    let mut all = Vec::with_capacity(local_by.len());
    for (l, r) in local_by.iter().zip(incoming_by) {
        all.push(super::coalesce::append(l, r)?);
    }
    let rows = encode(&all)?;

    let mut ids = HashMap::new();
    let mut out = Vec::with_capacity(local_len + incoming_len);
    for i in 0..local_len + incoming_len {
        if all.iter().any(|c| c.is_null(i)) {
            out.push(None);
            continue;
        }
        let next = ids.len();
        out.push(Some(*ids.entry(rows.row(i)).or_insert(next)));
    }
    let incoming_ids = out.split_off(local_len);
    Ok((out, incoming_ids))
}

/// Merge `incoming` onto `local` according to `spec`.
pub(crate) fn merge_as_of(
    local: &RecordBatch,
    incoming: &RecordBatch,
    spec: &AsOfSpec,
) -> MergeResult<(RecordBatch, ColumnPlan)> {
    let plan = ColumnPlan::as_of(&local.schema(), &incoming.schema(), spec)?;
    debug!(
        "as-of plan: keys={:?} overlap={:?} local_only={:?} right_only={:?} discarded={:?}",
        plan.keys(),
        plan.overlap(),
        plan.local_only(),
        plan.right_only(),
        plan.discarded()
    );

    let local_time_type = column(local, spec.left_on())?.data_type().clone();
    let incoming_time_type = column(incoming, spec.right_on())?.data_type().clone();
    if !is_orderable_temporal(&local_time_type) {
        return Err(MergeError::Temporal {
            source: TemporalError::Unsupported {
                column: spec.left_on().to_string(),
                datatype: local_time_type,
            },
        });
    }
    ensure!(
        local_time_type == incoming_time_type,
        TemporalTypeMismatchSnafu {
            left_on: spec.left_on(),
            right_on: spec.right_on(),
            local: local_time_type.clone(),
            incoming: incoming_time_type.clone(),
        }
    );

    for col in spec.by() {
        let l = column(local, col)?;
        let r = column(incoming, col)?;
        ensure!(
            l.data_type() == r.data_type(),
            KeyTypeMismatchSnafu {
                column: col.as_str(),
                local: l.data_type().clone(),
                incoming: r.data_type().clone(),
            }
        );
    }

    let mut sort_keys: Vec<&str> = spec.by().iter().map(String::as_str).collect();
    sort_keys.push(spec.left_on());
    let local = sort_batch(local, &sort_keys)?;
    sort_keys.pop();
    sort_keys.push(spec.right_on());
    let incoming = sort_batch(incoming, &sort_keys)?;

    let local_times = temporal_values(column(&local, spec.left_on())?.as_ref(), spec.left_on())
        .context(TemporalSnafu)?;
    let incoming_times =
        temporal_values(column(&incoming, spec.right_on())?.as_ref(), spec.right_on())
            .context(TemporalSnafu)?;

    let local_by = spec
        .by()
        .iter()
        .map(|c| column(&local, c))
        .collect::<MergeResult<Vec<_>>>()?;
    let incoming_by = spec
        .by()
        .iter()
        .map(|c| column(&incoming, c))
        .collect::<MergeResult<Vec<_>>>()?;
    let (local_groups, incoming_groups) =
        group_ids(&local_by, &incoming_by, local.num_rows(), incoming.num_rows())?;

    // Candidate times and row positions per group, ascending by time.
    let mut candidates: HashMap<usize, (Vec<i64>, Vec<usize>)> = HashMap::new();
    for (row, (group, time)) in incoming_groups.iter().zip(&incoming_times).enumerate() {
        if let (Some(group), Some(time)) = (group, time) {
            let entry = candidates.entry(*group).or_default();
            entry.0.push(*time);
            entry.1.push(row);
        }
    }

    let matches: Vec<Option<usize>> = local_groups
        .iter()
        .zip(&local_times)
        .map(|(group, time)| {
            let (group, time) = ((*group)?, (*time)?);
            let (times, rows) = candidates.get(&group)?;
            find_match(times, time, spec.strategy()).map(|p| rows[p])
        })
        .collect();
    debug!(
        "as-of matched {} of {} local rows",
        matches.iter().filter(|m| m.is_some()).count(),
        matches.len()
    );

    let local_schema = local.schema();
    let incoming_schema = incoming.schema();
    let mut fields: Vec<Field> = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();

    for name in plan.keys() {
        let idx = local_schema.index_of(name).context(ArrowSnafu)?;
        fields.push(local_schema.field(idx).clone().with_nullable(true));
        columns.push(local.column(idx).clone());
    }

    for name in plan.overlap() {
        let idx = local_schema.index_of(name).context(ArrowSnafu)?;
        let local_field = local_schema.field(idx);
        let local_values = local.column(idx);
        let incoming_values = column(&incoming, name)?;
        let conformed = conform(&incoming_values, local_field.data_type()).context(
            TypeMismatchSnafu {
                column: name.as_str(),
                local: local_field.data_type().clone(),
                incoming: incoming_values.data_type().clone(),
            },
        )?;
        let matched = gather(&conformed, &matches)?;
        fields.push(local_field.clone().with_nullable(true));
        columns.push(coalesce(&matched, local_values)?);
    }

    for name in plan.local_only() {
        let idx = local_schema.index_of(name).context(ArrowSnafu)?;
        fields.push(local_schema.field(idx).clone().with_nullable(true));
        columns.push(local.column(idx).clone());
    }

    for name in plan.right_only() {
        let idx = incoming_schema.index_of(name).context(ArrowSnafu)?;
        fields.push(incoming_schema.field(idx).clone().with_nullable(true));
        columns.push(gather(incoming.column(idx), &matches)?);
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema, columns).context(ArrowSnafu)?;
    Ok((batch, plan))
}
