use std::marker::PhantomData;

use partix_core::error::{Error, Result};

use super::InlinedAggregation;

/// Checked sum of nullable integers. Nulls are skipped; no values -> 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullableSum;

impl InlinedAggregation for NullableSum {
    type Element = Option<i64>;
    type Accumulator = i64;
    type Output = i64;

    fn name(&self) -> &'static str {
        "sum"
    }

    fn init(&self) -> i64 {
        0
    }

    fn fold(&self, acc: i64, element: Option<i64>) -> Result<i64> {
        match element {
            Some(v) => acc.checked_add(v).ok_or(Error::Overflow("sum")),
            None => Ok(acc),
        }
    }

    fn combine(&self, left: i64, right: i64) -> Result<i64> {
        left.checked_add(right).ok_or(Error::Overflow("sum"))
    }

    fn finish(&self, acc: i64) -> Result<i64> {
        Ok(acc)
    }
}

/// Number of elements, nulls included.
pub struct Count<T> {
    _element: PhantomData<fn() -> T>,
}

impl<T> Count<T> {
    pub fn new() -> Self {
        Self {
            _element: PhantomData,
        }
    }
}

impl<T> Default for Count<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> InlinedAggregation for Count<T> {
    type Element = T;
    type Accumulator = i64;
    type Output = i64;

    fn name(&self) -> &'static str {
        "count"
    }

    fn init(&self) -> i64 {
        0
    }

    fn fold(&self, acc: i64, _element: T) -> Result<i64> {
        acc.checked_add(1).ok_or(Error::Overflow("count"))
    }

    fn combine(&self, left: i64, right: i64) -> Result<i64> {
        left.checked_add(right).ok_or(Error::Overflow("count"))
    }

    fn finish(&self, acc: i64) -> Result<i64> {
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::InlinedAggregationOperator;
    use crate::test_support::{stream_of, ScopedExecutor};
    use partix_core::cancel::CancellationToken;

    #[test]
    fn sum_and_count() {
        let parts = || vec![vec![Some(3), None], vec![Some(-1)], vec![]];
        let cancel = CancellationToken::new();
        let sum = InlinedAggregationOperator::with_check_interval(NullableSum, 64)
            .run(stream_of(parts()), &ScopedExecutor, &cancel)
            .unwrap();
        assert_eq!(sum, 2);
        let count = InlinedAggregationOperator::with_check_interval(Count::new(), 64)
            .run(stream_of(parts()), &ScopedExecutor, &cancel)
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn combine_overflow_is_reported() {
        // Each partition fits; only the final combine overflows.
        let parts = vec![vec![Some(i64::MAX)], vec![Some(1)]];
        let err = InlinedAggregationOperator::with_check_interval(NullableSum, 64)
            .run(stream_of(parts), &ScopedExecutor, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Overflow("sum")));

        let err = NullableSum.fold(i64::MIN, Some(-1)).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
    }
}
