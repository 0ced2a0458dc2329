use partix_core::error::{Error, Result};

use super::options::AggregationOptions;
use super::InlinedAggregation;

type SeedFn<A> = Box<dyn Fn() -> A + Send + Sync>;
type FoldFn<A, E> = Box<dyn Fn(A, E) -> Result<A> + Send + Sync>;
type CombineFn<A> = Box<dyn Fn(A, A) -> Result<A> + Send + Sync>;
type FinishFn<A, O> = Box<dyn Fn(A) -> Result<O> + Send + Sync>;

/// User-supplied aggregation built from closures.
///
/// Partials are always combined in partition order, so only associativity is
/// required; commutativity is recorded but not relied upon.
pub struct CustomAggregate<E, A, O> {
    name: &'static str,
    options: AggregationOptions,
    seed: SeedFn<A>,
    fold: FoldFn<A, E>,
    combine: CombineFn<A>,
    finish: FinishFn<A, O>,
}

impl<E, A, O> CustomAggregate<E, A, O> {
    pub fn new(
        name: &'static str,
        options: AggregationOptions,
        seed: impl Fn() -> A + Send + Sync + 'static,
        fold: impl Fn(A, E) -> Result<A> + Send + Sync + 'static,
        combine: impl Fn(A, A) -> Result<A> + Send + Sync + 'static,
        finish: impl Fn(A) -> Result<O> + Send + Sync + 'static,
    ) -> Result<Self> {
        if !options.permits_parallel() {
            return Err(Error::InvalidArgument(format!(
                "aggregate `{name}` is not associative ({options:?}) and cannot run partitioned"
            )));
        }
        Ok(Self {
            name,
            options,
            seed: Box::new(seed),
            fold: Box::new(fold),
            combine: Box::new(combine),
            finish: Box::new(finish),
        })
    }

    pub fn options(&self) -> AggregationOptions {
        self.options
    }
}

impl<E, A, O> InlinedAggregation for CustomAggregate<E, A, O>
where
    E: Send + 'static,
    A: Send,
{
    type Element = E;
    type Accumulator = A;
    type Output = O;

    fn name(&self) -> &'static str {
        self.name
    }

    fn init(&self) -> A {
        (self.seed)()
    }

    fn fold(&self, acc: A, element: E) -> Result<A> {
        (self.fold)(acc, element)
    }

    fn combine(&self, left: A, right: A) -> Result<A> {
        (self.combine)(left, right)
    }

    fn finish(&self, acc: A) -> Result<O> {
        (self.finish)(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::InlinedAggregationOperator;
    use crate::test_support::{stream_of, ScopedExecutor};
    use partix_core::cancel::CancellationToken;

    fn concat(options: AggregationOptions) -> Result<CustomAggregate<Option<i64>, Vec<i64>, Vec<i64>>> {
        CustomAggregate::new(
            "concat",
            options,
            Vec::new,
            |mut acc: Vec<i64>, e: Option<i64>| {
                acc.extend(e);
                Ok(acc)
            },
            |mut l: Vec<i64>, r: Vec<i64>| {
                l.extend(r);
                Ok(l)
            },
            Ok,
        )
    }

    #[test]
    fn associative_only_keeps_partition_order() {
        let op = concat(AggregationOptions::Associative).unwrap();
        let out = InlinedAggregationOperator::with_check_interval(op, 64)
            .run(
                stream_of(vec![vec![Some(1), Some(2)], vec![None], vec![Some(3)]]),
                &ScopedExecutor,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn non_associative_is_rejected() {
        for options in [AggregationOptions::None, AggregationOptions::Commutative] {
            assert!(matches!(concat(options), Err(Error::InvalidArgument(_))));
        }
    }
}
