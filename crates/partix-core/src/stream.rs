//! Partitioned streams: the seam every pipeline stage plugs into.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::enumerator::BoxEnumerator;
use crate::error::{Error, Result};

/// Shared order-key comparer. Cloning is cheap.
pub struct KeyComparer<K> {
    cmp: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
}

impl<K> KeyComparer<K> {
    pub fn from_fn(f: impl Fn(&K, &K) -> Ordering + Send + Sync + 'static) -> Self {
        Self { cmp: Arc::new(f) }
    }

    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.cmp)(a, b)
    }

    pub fn reversed(&self) -> Self
    where
        K: 'static,
    {
        let inner = Arc::clone(&self.cmp);
        Self::from_fn(move |a, b| inner(b, a))
    }
}

impl<K: Ord> KeyComparer<K> {
    pub fn natural() -> Self {
        Self::from_fn(|a: &K, b: &K| a.cmp(b))
    }
}

impl<K> Clone for KeyComparer<K> {
    fn clone(&self) -> Self {
        Self {
            cmp: Arc::clone(&self.cmp),
        }
    }
}

impl<K> fmt::Debug for KeyComparer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeyComparer")
    }
}

/// Fixed-size set of per-partition enumerators sharing one key comparer.
///
/// The partition count is fixed at construction for the stream's lifetime.
pub struct PartitionedStream<T, K> {
    partitions: Vec<BoxEnumerator<T, K>>,
    comparer: KeyComparer<K>,
}

impl<T, K> PartitionedStream<T, K>
where
    T: 'static,
    K: 'static,
{
    pub fn new(partitions: Vec<BoxEnumerator<T, K>>, comparer: KeyComparer<K>) -> Result<Self> {
        if partitions.is_empty() {
            return Err(Error::InvalidArgument(
                "a partitioned stream needs at least one partition".into(),
            ));
        }
        Ok(Self {
            partitions,
            comparer,
        })
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn partition_mut(&mut self, index: usize) -> Option<&mut BoxEnumerator<T, K>> {
        self.partitions.get_mut(index)
    }

    pub fn comparer(&self) -> &KeyComparer<K> {
        &self.comparer
    }

    /// Hand every partition to its worker. The comparer stays with the consumer.
    pub fn into_parts(self) -> (Vec<BoxEnumerator<T, K>>, KeyComparer<K>) {
        (self.partitions, self.comparer)
    }

    /// Dispose every partition, even when some of them fail. Returns the first failure.
    pub fn dispose_all(&mut self) -> Result<()> {
        dispose_each(&mut self.partitions)
    }
}

/// Dispose all `partitions`; a failing partition never prevents its siblings
/// from being disposed.
pub fn dispose_each<T, K>(partitions: &mut [BoxEnumerator<T, K>]) -> Result<()>
where
    T: 'static,
    K: 'static,
{
    let mut first: Option<Error> = None;
    for (index, partition) in partitions.iter_mut().enumerate() {
        if let Err(e) = partition.dispose() {
            let e = match e {
                Error::Dispose { .. } => e,
                other => Error::Dispose {
                    partition: index,
                    reason: other.to_string(),
                },
            };
            first.get_or_insert(e);
        }
    }
    match first {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

impl<T, K> fmt::Debug for PartitionedStream<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionedStream")
            .field("partitions", &self.partitions.len())
            .finish()
    }
}
