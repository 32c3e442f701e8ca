//! In-memory merge engine.
//!
//! A [`MergeRequest`] pairs an incoming batch with a [`MergeKind`] and is
//! applied to the rows of a stored partition, producing a new batch and the
//! [`ColumnPlan`] that drove it. Nothing here touches storage: the caller
//! commits the result only after [`MergeRequest::apply`] succeeds.
//!
//! - **Upsert**: full outer merge on the keys. Incoming non-null values win
//!   over local ones; incoming nulls never overwrite. New keys are appended
//!   after the local rows, in incoming order.
//! - **Update**: left merge on the keys. Same coalesce rule; incoming-only
//!   keys are dropped.
//! - **AsOf**: each local row picks one incoming row of the same `by` group
//!   by temporal proximity (see [`AsOfStrategy`]).
//!
//! Keyed merges keep the local schema; as-of merges lay out `by…`,
//! `left_on`, overlap, local-only, then right-only columns.

mod asof;
mod coalesce;
mod error;
mod keyed;
mod keys;
mod plan;

use arrow::array::RecordBatch;

pub use asof::{AsOfSpec, AsOfStrategy, ParseStrategyError, find_match};
pub use error::{MergeError, MergeResult, Side};
pub use plan::ColumnPlan;

use keyed::{KeyedMode, merge_keyed};

/// Which merge to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeKind {
    /// Full outer merge on `keys`.
    Upsert {
        /// Key columns; normally the table's primary key.
        keys: Vec<String>,
    },
    /// Left merge on `on`.
    Update {
        /// Key columns to match on.
        on: Vec<String>,
    },
    /// Temporal merge.
    AsOf(AsOfSpec),
}

/// An incoming batch plus the merge to apply with it.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    incoming: RecordBatch,
    kind: MergeKind,
}

/// Result of a successful merge.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    batch: RecordBatch,
    plan: ColumnPlan,
}

impl MergeOutput {
    /// Merged rows.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Column plan computed for the merge.
    pub fn plan(&self) -> &ColumnPlan {
        &self.plan
    }

    /// Consume the output, keeping the merged rows.
    pub fn into_batch(self) -> RecordBatch {
        self.batch
    }
}

fn owned<I>(cols: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    cols.into_iter().map(Into::into).collect()
}

impl MergeRequest {
    /// Full outer merge on `keys`.
    pub fn upsert<I>(incoming: RecordBatch, keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            incoming,
            kind: MergeKind::Upsert { keys: owned(keys) },
        }
    }

    /// Left merge on `on`.
    pub fn update<I>(incoming: RecordBatch, on: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            incoming,
            kind: MergeKind::Update { on: owned(on) },
        }
    }

    /// Temporal merge described by `spec`.
    pub fn as_of(incoming: RecordBatch, spec: AsOfSpec) -> Self {
        Self {
            incoming,
            kind: MergeKind::AsOf(spec),
        }
    }

    /// The incoming rows.
    pub fn incoming(&self) -> &RecordBatch {
        &self.incoming
    }

    /// The merge to perform.
    pub fn kind(&self) -> &MergeKind {
        &self.kind
    }

    /// Merge the incoming rows into `local`, returning the new rows.
    ///
    /// `local` is not modified; on error nothing has been produced.
    pub fn apply(&self, local: &RecordBatch) -> MergeResult<MergeOutput> {
        let (batch, plan) = match &self.kind {
            MergeKind::Upsert { keys } => {
                merge_keyed(local, &self.incoming, keys, KeyedMode::Upsert)?
            }
            MergeKind::Update { on } => merge_keyed(local, &self.incoming, on, KeyedMode::Update)?,
            MergeKind::AsOf(spec) => asof::merge_as_of(local, &self.incoming, spec)?,
        };
        Ok(MergeOutput { batch, plan })
    }
}
