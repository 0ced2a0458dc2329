//! The executor seam.
//!
//! The core never spawns threads. It hands the executor one worker per
//! partition and expects each one to be driven to completion. Workers of a
//! repartitioned stream wait on each other at the exchange barrier, so an
//! executor must make progress on all of them at once (one thread per worker,
//! or a pool at least as wide as the worker count).

use crate::cancel::CancellationToken;
use crate::error::{Error, Result};

/// One partition's unit of work.
pub type Worker<'a, R> = Box<dyn FnOnce() -> Result<R> + Send + 'a>;

pub trait Executor: Send + Sync {
    /// Run every worker to completion. The result vector is indexed like `workers`.
    fn run<'a, R>(&self, workers: Vec<Worker<'a, R>>) -> Vec<Result<R>>
    where
        R: Send + 'a;
}

/// Fold per-partition results into one outcome.
///
/// The caller's own cancellation is reported as `Cancelled`. Otherwise the
/// first root-cause failure in partition order wins, then the first aborted
/// exchange (a consequence of some other failure), then sibling cancellation.
pub fn settle<R>(results: Vec<Result<R>>, cancel: &CancellationToken) -> Result<Vec<R>> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    let mut values = Vec::with_capacity(results.len());
    let mut failure: Option<Error> = None;
    let mut aborted: Option<Error> = None;
    let mut cancelled = false;
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) if e.is_cancelled() => cancelled = true,
            Err(e @ Error::ExchangeAborted(_)) => {
                aborted.get_or_insert(e);
            }
            Err(e) => {
                failure.get_or_insert(e);
            }
        }
    }
    if let Some(e) = failure.or(aborted) {
        return Err(e);
    }
    if cancelled {
        return Err(Error::Cancelled);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_beats_aborted_exchange() {
        let results: Vec<Result<u8>> = vec![
            Err(Error::ExchangeAborted("producer 1 failed".into())),
            Err(Error::Overflow("sum")),
            Err(Error::Cancelled),
        ];
        let err = settle(results, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, Error::Overflow("sum")));
    }

    #[test]
    fn caller_cancellation_wins() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let results: Vec<Result<u8>> = vec![Err(Error::Overflow("sum")), Ok(1)];
        assert!(settle(results, &cancel).unwrap_err().is_cancelled());
    }

    #[test]
    fn sibling_cancellation_without_cause_is_cancelled() {
        let results: Vec<Result<u8>> = vec![Ok(1), Err(Error::Cancelled)];
        assert!(settle(results, &CancellationToken::new())
            .unwrap_err()
            .is_cancelled());
    }

    #[test]
    fn all_ok_keeps_order() {
        let results: Vec<Result<u8>> = vec![Ok(3), Ok(1), Ok(2)];
        assert_eq!(settle(results, &CancellationToken::new()).unwrap(), vec![3, 1, 2]);
    }
}
