//! Runtime: run one worker per partition and consume what they produce.
//!
//! - `ThreadExecutor` gives every worker its own named scoped thread, so all
//!   partitions of a repartitioned stream can meet at the exchange barrier.
//! - `drain_partition` pulls a single partition dry and always disposes it.
//! - `collect_unordered` concatenates partitions in partition order.
//! - `collect_ordered` merges partitions by order key; ties go to the lower
//!   partition index, so source indices come back in source order.

use std::thread;

use partix_core::cancel::{CancelPoll, CancellationToken};
use partix_core::config::DEFAULT_CANCEL_CHECK_INTERVAL;
use partix_core::enumerator::{BoxEnumerator, PartitionEnumerator};
use partix_core::error::{Error, Result};
use partix_core::executor::{settle, Executor, Worker};
use partix_core::merge::KWayMerge;
use partix_core::stream::{KeyComparer, PartitionedStream};

/// Thread-per-worker executor built on `std::thread::scope`.
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    name_prefix: String,
}

impl ThreadExecutor {
    pub fn new() -> Self {
        Self::named("partix-worker")
    }

    /// Worker threads are called `{prefix}-{partition}`.
    pub fn named(prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: prefix.into(),
        }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for ThreadExecutor {
    fn run<'a, R>(&self, workers: Vec<Worker<'a, R>>) -> Vec<Result<R>>
    where
        R: Send + 'a,
    {
        thread::scope(|scope| {
            // Spawn everything before joining anything: workers may block on
            // each other.
            let handles: Vec<_> = workers
                .into_iter()
                .enumerate()
                .map(|(partition, worker)| {
                    thread::Builder::new()
                        .name(format!("{}-{partition}", self.name_prefix))
                        .spawn_scoped(scope, worker)
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(partition, handle)| match handle {
                    Ok(handle) => match handle.join() {
                        Ok(result) => result,
                        Err(_) => {
                            #[cfg(feature = "tracing")]
                            tracing::error!(partition, "worker panicked");
                            Err(Error::WorkerPanicked { partition })
                        }
                    },
                    Err(e) => Err(Error::Invariant(format!(
                        "failed to spawn worker {partition}: {e}"
                    ))),
                })
                .collect()
        })
    }
}

/// Pull `partition` to exhaustion, then dispose it.
///
/// Disposal runs whether or not draining succeeded; a drain error wins over a
/// disposal error.
pub fn drain_partition<T, K>(
    mut partition: BoxEnumerator<T, K>,
    cancel: &CancellationToken,
    check_interval: usize,
) -> Result<Vec<(T, K)>>
where
    T: 'static,
    K: 'static,
{
    let mut poll = CancelPoll::new(cancel.clone(), check_interval);
    let mut out = Vec::new();
    let drained = cancel.check().and_then(|()| loop {
        poll.tick()?;
        match partition.advance()?.into_option() {
            Some(pair) => out.push(pair),
            None => return Ok(()),
        }
    });
    let disposed = partition.dispose();
    drained?;
    disposed?;
    Ok(out)
}

/// Drain every partition of `stream` on `executor`.
///
/// The first failing partition cancels the others; the outcome is decided by
/// [`settle`].
pub fn drain_all<T, K, E>(
    stream: PartitionedStream<T, K>,
    executor: &E,
    cancel: &CancellationToken,
    check_interval: usize,
) -> Result<(Vec<Vec<(T, K)>>, KeyComparer<K>)>
where
    T: Send + 'static,
    K: Send + 'static,
    E: Executor,
{
    drain_with(stream, executor, cancel, check_interval, |_, run| run)
}

fn drain_with<T, K, E, F>(
    stream: PartitionedStream<T, K>,
    executor: &E,
    cancel: &CancellationToken,
    check_interval: usize,
    finish: F,
) -> Result<(Vec<Vec<(T, K)>>, KeyComparer<K>)>
where
    T: Send + 'static,
    K: Send + 'static,
    E: Executor,
    F: Fn(&KeyComparer<K>, Vec<(T, K)>) -> Vec<(T, K)> + Sync,
{
    let (partitions, comparer) = stream.into_parts();
    let siblings = cancel.child();

    let workers: Vec<Worker<'_, Vec<(T, K)>>> = partitions
        .into_iter()
        .enumerate()
        .map(|(index, partition)| {
            #[cfg(not(feature = "tracing"))]
            let _ = index;
            let siblings = siblings.clone();
            let comparer = &comparer;
            let finish = &finish;
            Box::new(move || {
                let drained = drain_partition(partition, &siblings, check_interval);
                match drained {
                    Ok(run) => Ok(finish(comparer, run)),
                    Err(e) => {
                        siblings.cancel();
                        #[cfg(feature = "tracing")]
                        {
                            if !e.is_cancelled() {
                                tracing::debug!(partition = index, error = %e, "partition failed");
                            }
                        }
                        Err(e)
                    }
                }
            }) as Worker<'_, Vec<(T, K)>>
        })
        .collect();

    let runs = settle(executor.run(workers), cancel)?;
    Ok((runs, comparer))
}

/// Every element of `stream`, partition 0 first.
pub fn collect_unordered<T, K, E>(
    stream: PartitionedStream<T, K>,
    executor: &E,
    cancel: &CancellationToken,
) -> Result<Vec<T>>
where
    T: Send + 'static,
    K: Send + 'static,
    E: Executor,
{
    let (runs, _) = drain_all(stream, executor, cancel, DEFAULT_CANCEL_CHECK_INTERVAL)?;
    Ok(concat(runs))
}

/// Every `(element, key)` of `stream`, merged by the stream's comparer.
pub fn collect_ordered<T, K, E>(
    stream: PartitionedStream<T, K>,
    executor: &E,
    cancel: &CancellationToken,
) -> Result<Vec<(T, K)>>
where
    T: Send + 'static,
    K: Send + 'static,
    E: Executor,
{
    collect_ordered_with(stream, executor, cancel, DEFAULT_CANCEL_CHECK_INTERVAL)
}

pub(crate) fn collect_ordered_with<T, K, E>(
    stream: PartitionedStream<T, K>,
    executor: &E,
    cancel: &CancellationToken,
    check_interval: usize,
) -> Result<Vec<(T, K)>>
where
    T: Send + 'static,
    K: Send + 'static,
    E: Executor,
{
    // Runs are sorted on the workers; the caller only merges.
    let (runs, comparer) = drain_with(stream, executor, cancel, check_interval, |cmp, mut run| {
        run.sort_by(|a, b| cmp.compare(&a.1, &b.1));
        run
    })?;
    Ok(KWayMerge::new(runs, comparer).collect())
}

pub(crate) fn concat<T, K>(runs: Vec<Vec<(T, K)>>) -> Vec<T> {
    runs.into_iter().flatten().map(|(item, _)| item).collect()
}
