//! Hash repartitioning (the shuffle).
//!
//! Output partition j owns input partition j. On its first advance it runs
//! the hash phase for that input: every element is routed to cell
//! [j][hash(key) mod N] of a fresh exchange. It then publishes its row and
//! waits at the barrier; only when all N inputs have published does it read
//! column j. No output partition yields anything before every input finished
//! hashing, which is why an executor must drive all N outputs concurrently.
//!
//! - `unordered`: the read phase concatenates cells in producer order and the
//!   output carries no order key (`()`).
//! - `ordered`: cells carry the original order keys, each producer sorts its
//!   cells by the stream comparer before publishing, and the read phase k-way
//!   merges the N cells, so every output partition yields ascending keys.

pub mod exchange;
mod ordered;
mod unordered;

use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use partix_core::cancel::{CancelPoll, CancellationToken};
use partix_core::config::EngineConfig;
use partix_core::enumerator::{Advance, BoxEnumerator};
use partix_core::error::{Error, Result};
use partix_core::hash::{route, RouteHasher};
use partix_core::id::StageId;
use partix_core::stream::{KeyComparer, PartitionedStream};

use exchange::{exchange, ExchangeReader, ExchangeWriter};
pub use ordered::OrderedHashRepartitionEnumerator;
pub use unordered::HashRepartitionEnumerator;

pub type HashKeySelector<T, H> = Arc<dyn Fn(&T) -> H + Send + Sync>;

/// An element together with the key that routed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hashed<T, H> {
    pub element: T,
    pub hash_key: H,
}

/// Factory for repartitioned streams.
///
/// Hash-key equality is the key type's `Eq`/`Hash`; a custom notion of
/// equality is expressed through the key type or a different `BuildHasher`.
#[derive(Clone)]
pub struct HashRepartition<S = RouteHasher> {
    hasher: S,
    cancel: CancellationToken,
    check_interval: usize,
    stage: StageId,
}

impl HashRepartition<RouteHasher> {
    /// `cancel` is the token the hash phase and the barrier wait observe.
    ///
    /// Consumers drive the outputs under their own token, which these stages
    /// never see. Pass that run token here, or a child of it, so cancelling
    /// the run also stops a producer that is still hashing.
    pub fn new(config: &EngineConfig, cancel: CancellationToken) -> Self {
        Self {
            hasher: RouteHasher::with_seed(config.hash_seed),
            cancel,
            check_interval: config.cancel_check_interval,
            stage: StageId::new(0),
        }
    }
}

impl<S> HashRepartition<S>
where
    S: BuildHasher + Clone + Send + 'static,
{
    pub fn with_hasher<S2>(self, hasher: S2) -> HashRepartition<S2> {
        HashRepartition {
            hasher,
            cancel: self.cancel,
            check_interval: self.check_interval,
            stage: self.stage,
        }
    }

    /// Tag emitted events with `stage`.
    pub fn with_stage(mut self, stage: StageId) -> Self {
        self.stage = stage;
        self
    }

    /// Shuffle without order preservation.
    pub fn unordered<T, K, H>(
        &self,
        input: PartitionedStream<T, K>,
        selector: impl Fn(&T) -> H + Send + Sync + 'static,
    ) -> Result<PartitionedStream<Hashed<T, H>, ()>>
    where
        T: Send + 'static,
        K: Send + 'static,
        H: Hash + Send + 'static,
    {
        let selector: HashKeySelector<T, H> = Arc::new(selector);
        let (inputs, _) = input.into_parts();
        let (writers, readers) = exchange(inputs.len());

        let outputs = self
            .hash_inputs(inputs, writers, readers, selector)
            .map(|shuffle| {
                Box::new(HashRepartitionEnumerator::new(shuffle))
                    as BoxEnumerator<Hashed<T, H>, ()>
            })
            .collect();
        PartitionedStream::new(outputs, KeyComparer::from_fn(|_: &(), _: &()| {
            std::cmp::Ordering::Equal
        }))
    }

    /// Shuffle carrying order keys; each output partition is sorted by key.
    pub fn ordered<T, K, H>(
        &self,
        input: PartitionedStream<T, K>,
        selector: impl Fn(&T) -> H + Send + Sync + 'static,
    ) -> Result<PartitionedStream<Hashed<T, H>, K>>
    where
        T: Send + 'static,
        K: Send + 'static,
        H: Hash + Send + 'static,
    {
        let selector: HashKeySelector<T, H> = Arc::new(selector);
        let (inputs, comparer) = input.into_parts();
        let (writers, readers) = exchange(inputs.len());

        let outputs = self
            .hash_inputs(inputs, writers, readers, selector)
            .map(|shuffle| {
                Box::new(OrderedHashRepartitionEnumerator::new(
                    shuffle,
                    comparer.clone(),
                )) as BoxEnumerator<Hashed<T, H>, K>
            })
            .collect();
        PartitionedStream::new(outputs, comparer)
    }

    /// Unordered shuffle where each element is its own hash key.
    pub fn by_element<T, K>(
        &self,
        input: PartitionedStream<T, K>,
    ) -> Result<PartitionedStream<Hashed<T, T>, ()>>
    where
        T: Hash + Clone + Send + 'static,
        K: Send + 'static,
    {
        self.unordered(input, T::clone)
    }

    fn hash_inputs<'a, T, K, H, C>(
        &'a self,
        inputs: Vec<BoxEnumerator<T, K>>,
        writers: Vec<ExchangeWriter<C>>,
        readers: Vec<ExchangeReader<C>>,
        selector: HashKeySelector<T, H>,
    ) -> impl Iterator<Item = ShuffleInput<T, K, H, S, C>> + 'a
    where
        T: Send + 'static,
        K: Send + 'static,
        H: Hash + Send + 'static,
        C: Send + 'a,
    {
        inputs
            .into_iter()
            .zip(writers)
            .zip(readers)
            .enumerate()
            .map(move |(partition, ((input, writer), reader))| ShuffleInput {
                partition,
                stage: self.stage,
                input: Some(input),
                writer: Some(writer),
                reader: Some(reader),
                selector: Arc::clone(&selector),
                hasher: self.hasher.clone(),
                cancel: self.cancel.clone(),
                check_interval: self.check_interval,
            })
    }
}

/// State shared by both output flavours: the owned input partition and this
/// partition's two ends of the exchange.
pub(crate) struct ShuffleInput<T, K, H, S, C> {
    partition: usize,
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    stage: StageId,
    input: Option<BoxEnumerator<T, K>>,
    writer: Option<ExchangeWriter<C>>,
    reader: Option<ExchangeReader<C>>,
    selector: HashKeySelector<T, H>,
    hasher: S,
    cancel: CancellationToken,
    check_interval: usize,
}

impl<T, K, H, S, C> ShuffleInput<T, K, H, S, C>
where
    T: Send + 'static,
    K: Send + 'static,
    H: Hash,
    S: BuildHasher,
{
    /// Run the hash phase, publish, wait at the barrier and return this
    /// partition's column. `wrap` builds a cell item; `seal` runs over the
    /// filled row right before it is published.
    pub(crate) fn exchange(
        &mut self,
        wrap: impl Fn(Hashed<T, H>, K) -> C,
        seal: impl FnOnce(&mut [Vec<C>]),
    ) -> Result<Vec<Vec<C>>> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| Error::Invariant("hash phase ran twice".into()))?;

        if let Err(e) = self.hash_phase(&mut writer, &wrap) {
            writer.abort(format!("producer {} failed: {}", self.partition, e));
            if let Err(_dispose_err) = self.release_input() {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    stage = %self.stage,
                    partition = self.partition,
                    error = %_dispose_err,
                    "input dispose failed after hash phase error"
                );
            }
            return Err(e);
        }
        self.release_input()?;

        seal(writer.cells_mut());
        #[cfg(feature = "tracing")]
        tracing::debug!(
            stage = %self.stage,
            partition = self.partition,
            rows = writer.buffered(),
            "hash phase published"
        );
        writer.publish()?;

        let reader = self
            .reader
            .take()
            .ok_or_else(|| Error::Invariant("exchange column read twice".into()))?;
        let cells = reader.take(&self.cancel)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(stage = %self.stage, partition = self.partition, "barrier released");
        Ok(cells)
    }

    fn hash_phase(
        &mut self,
        writer: &mut ExchangeWriter<C>,
        wrap: &impl Fn(Hashed<T, H>, K) -> C,
    ) -> Result<()> {
        let input = self
            .input
            .as_mut()
            .ok_or_else(|| Error::Invariant("input partition already released".into()))?;
        let partitions = writer.cells_mut().len();
        let mut poll = CancelPoll::new(self.cancel.clone(), self.check_interval);
        self.cancel.check()?;
        loop {
            match input.advance()? {
                Advance::Yielded(element, key) => {
                    poll.tick()?;
                    let hash_key = (self.selector)(&element);
                    let dest = route(&hash_key, partitions, &self.hasher);
                    writer.push(dest, wrap(Hashed { element, hash_key }, key));
                }
                Advance::Exhausted => return Ok(()),
            }
        }
    }

    /// Dispose the input partition; a no-op after the first call.
    fn release_input(&mut self) -> Result<()> {
        match self.input.take() {
            Some(mut input) => input.dispose(),
            None => Ok(()),
        }
    }

    /// Dispose for an output partition. If the hash phase never ran, the
    /// exchange is aborted so sibling partitions do not wait forever.
    pub(crate) fn dispose(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.abort(format!(
                "output partition {} disposed before hashing",
                self.partition
            ));
        }
        self.reader = None;
        self.release_input()
    }
}
