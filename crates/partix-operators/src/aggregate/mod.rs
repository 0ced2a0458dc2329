//! Inlined aggregation: parallel per-partition folds, one sequential combine.
//!
//! Each partition runs its own fold state machine
//! (`NotStarted` -> `Accumulating` -> `Done`), polling cancellation every
//! `cancel_check_interval` elements. When every partition is done, the
//! accumulators are combined in partition order on the calling thread; that
//! step touches at most N values, never the data itself.
//!
//! Failure policy:
//! - a cancelled or failed partition never contributes a partial accumulator;
//! - the first failing partition cancels its siblings through a child token;
//! - the caller sees `Cancelled` if its own token fired, otherwise the first
//!   root-cause failure in partition order;
//! - every partition is disposed, whatever happened to the others.

mod average;
mod custom;
mod minmax;
pub mod options;
mod sum;

pub use average::{AverageAccumulator, NullableAverage};
pub use custom::CustomAggregate;
pub use minmax::NullableMinMax;
pub use options::{is_valid, AggregationOptions};
pub use sum::{Count, NullableSum};

use partix_core::cancel::{CancelPoll, CancellationToken};
use partix_core::config::EngineConfig;
use partix_core::enumerator::{Advance, BoxEnumerator, PartitionEnumerator};
use partix_core::error::{Error, Result};
use partix_core::executor::{settle, Executor, Worker};
use partix_core::stream::PartitionedStream;

/// An aggregation whose partial results can be computed per partition.
pub trait InlinedAggregation: Send + Sync {
    type Element: Send + 'static;
    type Accumulator: Send;
    type Output;

    /// Stable, human-readable name (used in events and overflow errors).
    fn name(&self) -> &'static str;

    /// Empty accumulator; also the identity of `combine`.
    fn init(&self) -> Self::Accumulator;

    fn fold(&self, acc: Self::Accumulator, element: Self::Element) -> Result<Self::Accumulator>;

    fn combine(&self, left: Self::Accumulator, right: Self::Accumulator)
        -> Result<Self::Accumulator>;

    fn finish(&self, acc: Self::Accumulator) -> Result<Self::Output>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldState {
    NotStarted,
    Accumulating,
    Done,
}

/// Fold of one partition.
pub struct PartitionFold<'a, A: InlinedAggregation> {
    op: &'a A,
    state: FoldState,
    acc: Option<A::Accumulator>,
    poll: CancelPoll,
}

impl<'a, A: InlinedAggregation> PartitionFold<'a, A> {
    pub fn new(op: &'a A, cancel: CancellationToken, check_interval: usize) -> Self {
        Self {
            op,
            state: FoldState::NotStarted,
            acc: None,
            poll: CancelPoll::new(cancel, check_interval),
        }
    }

    pub fn state(&self) -> FoldState {
        self.state
    }

    /// Fold one element, starting the accumulator on first use.
    pub fn step(&mut self, element: A::Element) -> Result<()> {
        let acc = match self.state {
            FoldState::NotStarted => {
                self.poll.token().check()?;
                self.state = FoldState::Accumulating;
                self.op.init()
            }
            FoldState::Accumulating => self
                .acc
                .take()
                .ok_or_else(|| Error::Invariant("accumulator lost mid-fold".into()))?,
            FoldState::Done => {
                return Err(Error::Invariant("fold already finished".into()));
            }
        };
        self.poll.tick()?;
        self.acc = Some(self.op.fold(acc, element)?);
        Ok(())
    }

    /// Close the fold and hand out its accumulator.
    pub fn finish(&mut self) -> Result<A::Accumulator> {
        let acc = match self.state {
            FoldState::NotStarted => {
                self.poll.token().check()?;
                self.op.init()
            }
            FoldState::Accumulating => self
                .acc
                .take()
                .ok_or_else(|| Error::Invariant("accumulator lost mid-fold".into()))?,
            FoldState::Done => {
                return Err(Error::Invariant("fold already finished".into()));
            }
        };
        self.state = FoldState::Done;
        Ok(acc)
    }

    /// Pull `partition` to exhaustion and return the local accumulator.
    pub fn drain<K>(mut self, partition: &mut BoxEnumerator<A::Element, K>) -> Result<A::Accumulator>
    where
        K: 'static,
    {
        loop {
            match partition.advance()? {
                Advance::Yielded(element, _) => self.step(element)?,
                Advance::Exhausted => return self.finish(),
            }
        }
    }
}

/// Runs an [`InlinedAggregation`] over a partitioned stream.
pub struct InlinedAggregationOperator<A> {
    op: A,
    check_interval: usize,
}

impl<A: InlinedAggregation> InlinedAggregationOperator<A> {
    pub fn new(op: A, config: &EngineConfig) -> Self {
        Self::with_check_interval(op, config.cancel_check_interval)
    }

    pub fn with_check_interval(op: A, check_interval: usize) -> Self {
        Self {
            op,
            check_interval: check_interval.max(1),
        }
    }

    pub fn op(&self) -> &A {
        &self.op
    }

    pub fn run<K, E>(
        &self,
        stream: PartitionedStream<A::Element, K>,
        executor: &E,
        cancel: &CancellationToken,
    ) -> Result<A::Output>
    where
        K: Send + 'static,
        E: Executor,
    {
        let (partitions, _) = stream.into_parts();
        let siblings = cancel.child();

        let workers: Vec<Worker<'_, A::Accumulator>> = partitions
            .into_iter()
            .enumerate()
            .map(|(index, mut partition)| {
                let siblings = siblings.clone();
                let op = &self.op;
                let check_interval = self.check_interval;
                Box::new(move || {
                    let fold = PartitionFold::new(op, siblings.clone(), check_interval);
                    let folded = fold.drain(&mut partition);
                    let disposed = partition.dispose();
                    if folded.is_err() || disposed.is_err() {
                        siblings.cancel();
                    }
                    #[cfg(feature = "tracing")]
                    {
                        if let Err(e) = &folded {
                            tracing::debug!(op = op.name(), partition = index, error = %e, "partition fold failed");
                        }
                    }
                    let acc = folded?;
                    disposed.map_err(|e| match e {
                        Error::Dispose { .. } => e,
                        other => Error::Dispose {
                            partition: index,
                            reason: other.to_string(),
                        },
                    })?;
                    Ok(acc)
                }) as Worker<'_, A::Accumulator>
            })
            .collect();

        let results = executor.run(workers);
        #[cfg(feature = "tracing")]
        {
            if cancel.is_cancelled() {
                tracing::debug!(op = self.op.name(), "aggregation cancelled by caller");
            }
        }
        let partials = settle(results, cancel)?;

        #[cfg(feature = "tracing")]
        tracing::trace!(op = self.op.name(), partials = partials.len(), "combining partials");

        let total = partials
            .into_iter()
            .try_fold(self.op.init(), |left, right| self.op.combine(left, right))?;
        self.op.finish(total)
    }
}
