use partix_core::error::{Error, Result};

use super::InlinedAggregation;

/// Running `(sum, count)` of the non-null values seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AverageAccumulator {
    pub sum: i64,
    pub count: i64,
}

/// Average of nullable integers. Nulls are skipped; no values -> `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullableAverage;

impl InlinedAggregation for NullableAverage {
    type Element = Option<i64>;
    type Accumulator = AverageAccumulator;
    type Output = Option<f64>;

    fn name(&self) -> &'static str {
        "average"
    }

    fn init(&self) -> AverageAccumulator {
        AverageAccumulator::default()
    }

    fn fold(&self, acc: AverageAccumulator, element: Option<i64>) -> Result<AverageAccumulator> {
        let Some(value) = element else {
            return Ok(acc);
        };
        Ok(AverageAccumulator {
            sum: acc
                .sum
                .checked_add(value)
                .ok_or(Error::Overflow("average sum"))?,
            count: acc
                .count
                .checked_add(1)
                .ok_or(Error::Overflow("average count"))?,
        })
    }

    fn combine(
        &self,
        left: AverageAccumulator,
        right: AverageAccumulator,
    ) -> Result<AverageAccumulator> {
        Ok(AverageAccumulator {
            sum: left
                .sum
                .checked_add(right.sum)
                .ok_or(Error::Overflow("average sum"))?,
            count: left
                .count
                .checked_add(right.count)
                .ok_or(Error::Overflow("average count"))?,
        })
    }

    fn finish(&self, acc: AverageAccumulator) -> Result<Option<f64>> {
        if acc.count == 0 {
            return Ok(None);
        }
        Ok(Some(acc.sum as f64 / acc.count as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::InlinedAggregationOperator;
    use crate::test_support::{stream_of, ScopedExecutor};
    use partix_core::cancel::CancellationToken;

    fn average(parts: Vec<Vec<Option<i64>>>) -> Result<Option<f64>> {
        InlinedAggregationOperator::with_check_interval(NullableAverage, 64).run(
            stream_of(parts),
            &ScopedExecutor,
            &CancellationToken::new(),
        )
    }

    #[test]
    fn average_ignores_boundary_placement() {
        let input = [Some(2), None, Some(4), Some(6)];
        for split in 0..=input.len() {
            let parts = vec![input[..split].to_vec(), input[split..].to_vec()];
            assert_eq!(average(parts).unwrap(), Some(4.0), "split at {split}");
        }
    }

    #[test]
    fn empty_and_all_null_have_no_value() {
        assert_eq!(average(vec![vec![], vec![]]).unwrap(), None);
        assert_eq!(average(vec![vec![None, None], vec![None]]).unwrap(), None);
    }

    #[test]
    fn fractional_average() {
        assert_eq!(average(vec![vec![Some(1)], vec![Some(2)]]).unwrap(), Some(1.5));
    }

    #[test]
    fn sum_overflow_is_reported() {
        let err = average(vec![vec![Some(i64::MAX)], vec![Some(i64::MAX)]]).unwrap_err();
        assert!(matches!(err, Error::Overflow("average sum")));
    }
}
