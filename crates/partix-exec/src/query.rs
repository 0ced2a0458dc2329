//! Query builder: source -> per-partition stages -> shuffle -> consumer.
//!
//! A `Query` owns its partitioned stream, its configuration and its
//! cancellation token. Every stage consumes the query and returns the next
//! one, so a stream can never be driven by two consumers.

use std::hash::Hash;
use std::sync::Arc;

use partix_core::cancel::CancellationToken;
use partix_core::config::EngineConfig;
use partix_core::error::Result;
use partix_core::id::{QueryId, StageId};
use partix_core::stream::{KeyComparer, PartitionedStream};

use partix_operators::aggregate::{InlinedAggregation, InlinedAggregationOperator};
use partix_operators::repartition::{HashRepartition, Hashed};
use partix_operators::source::{IndexedSource, ListPartitioner};
use partix_operators::{filter::filter_stream, map::map_stream, sort_key::sort_key_stream};

use crate::metrics::emit_span;
use crate::runtime::{collect_ordered_with, concat, drain_all, ThreadExecutor};

pub struct Query<T, K> {
    id: QueryId,
    config: EngineConfig,
    cancel: CancellationToken,
    executor: ThreadExecutor,
    stream: PartitionedStream<T, K>,
    next_stage: u64,
}

impl<T: Send + 'static> Query<T, usize> {
    /// Partition `source` as `config` says; order keys are source indices.
    pub fn from_source<S>(source: S, config: EngineConfig) -> Result<Self>
    where
        S: IndexedSource<Item = T>,
    {
        Self::from_shared(Arc::new(source), config)
    }

    pub fn from_shared<S>(source: Arc<S>, config: EngineConfig) -> Result<Self>
    where
        S: IndexedSource<Item = T>,
    {
        config.validate()?;
        let stream = ListPartitioner::from_config(source, &config)?;
        let id = QueryId::new();
        emit_span(
            id,
            StageId::new(0),
            "source",
            &[
                ("partitions", config.partition_count.to_string()),
                ("striped", config.striped.to_string()),
            ],
        );
        Ok(Self {
            id,
            config,
            cancel: CancellationToken::new(),
            executor: ThreadExecutor::new(),
            stream,
            next_stage: 1,
        })
    }
}

impl<T, K> Query<T, K>
where
    T: Send + 'static,
    K: Send + 'static,
{
    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn partition_count(&self) -> usize {
        self.stream.partition_count()
    }

    /// A handle that cancels this query from any thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the workers on threads called `{prefix}-{partition}`.
    pub fn with_thread_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.executor = ThreadExecutor::named(prefix);
        self
    }

    pub fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Result<Self> {
        self.then("filter", |stream, _| filter_stream(stream, predicate))
    }

    pub fn map<U>(self, projection: impl Fn(T) -> U + Send + Sync + 'static) -> Result<Query<U, K>>
    where
        U: Send + 'static,
    {
        self.then("map", |stream, _| map_stream(stream, projection))
    }

    /// Re-key by `selector` under the natural order of the new key.
    pub fn order_by<K2>(
        self,
        selector: impl Fn(&T) -> K2 + Send + Sync + 'static,
    ) -> Result<Query<T, K2>>
    where
        K2: Ord + Send + 'static,
    {
        self.order_by_with(selector, KeyComparer::natural())
    }

    pub fn order_by_with<K2>(
        self,
        selector: impl Fn(&T) -> K2 + Send + Sync + 'static,
        comparer: KeyComparer<K2>,
    ) -> Result<Query<T, K2>>
    where
        K2: Send + 'static,
    {
        self.then("order_by", |stream, _| sort_key_stream(stream, selector, comparer))
    }

    /// Hash shuffle on `selector`; order keys are dropped.
    pub fn repartition<H>(
        self,
        selector: impl Fn(&T) -> H + Send + Sync + 'static,
    ) -> Result<Query<Hashed<T, H>, ()>>
    where
        H: Hash + Send + 'static,
    {
        self.then("repartition", |stream, ctx| {
            ctx.repartition().unordered(stream, selector)
        })
    }

    /// Hash shuffle on `selector` keeping order keys; every output partition
    /// comes out sorted by key.
    pub fn repartition_ordered<H>(
        self,
        selector: impl Fn(&T) -> H + Send + Sync + 'static,
    ) -> Result<Query<Hashed<T, H>, K>>
    where
        H: Hash + Send + 'static,
    {
        self.then("repartition_ordered", |stream, ctx| {
            ctx.repartition().ordered(stream, selector)
        })
    }

    /// Drain every partition. With `config.ordered` the result follows the
    /// order keys, otherwise partitions are concatenated in index order.
    pub fn collect(self) -> Result<Vec<T>> {
        if self.config.ordered {
            return Ok(self
                .collect_with_keys()?
                .into_iter()
                .map(|(item, _)| item)
                .collect());
        }
        let (runs, _) = drain_all(
            self.stream,
            &self.executor,
            &self.cancel,
            self.config.cancel_check_interval,
        )?;
        Ok(concat(runs))
    }

    /// Drain every partition and merge by order key.
    pub fn collect_with_keys(self) -> Result<Vec<(T, K)>> {
        collect_ordered_with(
            self.stream,
            &self.executor,
            &self.cancel,
            self.config.cancel_check_interval,
        )
    }

    /// Fold every partition with `op` and combine the partials.
    pub fn aggregate<A>(self, op: A) -> Result<A::Output>
    where
        A: InlinedAggregation<Element = T>,
    {
        let stage = StageId::new(self.next_stage);
        emit_span(
            self.id,
            stage,
            op.name(),
            &[("partitions", self.stream.partition_count().to_string())],
        );
        InlinedAggregationOperator::new(op, &self.config).run(self.stream, &self.executor, &self.cancel)
    }

    pub fn into_stream(self) -> PartitionedStream<T, K> {
        self.stream
    }

    fn then<U, K2>(
        self,
        event: &str,
        build: impl FnOnce(PartitionedStream<T, K>, &StageContext<'_>) -> Result<PartitionedStream<U, K2>>,
    ) -> Result<Query<U, K2>>
    where
        U: 'static,
        K2: 'static,
    {
        let ctx = StageContext {
            config: &self.config,
            cancel: &self.cancel,
            stage: StageId::new(self.next_stage),
        };
        let stream = build(self.stream, &ctx)?;
        emit_span(
            self.id,
            ctx.stage,
            event,
            &[("partitions", stream.partition_count().to_string())],
        );
        Ok(Query {
            id: self.id,
            config: self.config,
            cancel: self.cancel,
            executor: self.executor,
            stream,
            next_stage: self.next_stage + 1,
        })
    }
}

struct StageContext<'a> {
    config: &'a EngineConfig,
    cancel: &'a CancellationToken,
    stage: StageId,
}

impl StageContext<'_> {
    fn repartition(&self) -> HashRepartition {
        HashRepartition::new(self.config, self.cancel.clone()).with_stage(self.stage)
    }
}
