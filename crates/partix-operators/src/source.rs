//! Source partitioner: splits an indexable source into N partitions.
//!
//! Two layouts:
//! - contiguous ranges: partition p owns one run of roughly M/N indices; the
//!   first `M % N` partitions take one extra index. Concatenating partitions
//!   in order reproduces the source order.
//! - stripes: partition p owns {p, p+N, p+2N, ...}; better balance when the
//!   cost of an element depends on its position.
//!
//! The order key of every element is its source index.

use std::ops::Range;
use std::sync::Arc;

use partix_core::config::EngineConfig;
use partix_core::enumerator::{Advance, BoxEnumerator, PartitionEnumerator};
use partix_core::error::{Error, Result};
use partix_core::stream::{KeyComparer, PartitionedStream};

/// Random-access, sized source.
pub trait IndexedSource: Send + Sync + 'static {
    type Item: Send + 'static;

    fn len(&self) -> usize;

    /// Element at `index`; `index < len()` is guaranteed by the partitioner.
    fn get(&self, index: usize) -> Self::Item;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `None` when the length does not fit in `usize`.
    fn checked_len(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T> IndexedSource for Vec<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> T {
        self[index].clone()
    }
}

impl<T> IndexedSource for Box<[T]>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn get(&self, index: usize) -> T {
        self[index].clone()
    }
}

impl IndexedSource for Range<i64> {
    type Item = i64;

    /// Saturates at `usize::MAX`; the partitioner goes through `checked_len`.
    fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    fn get(&self, index: usize) -> i64 {
        // Exact for every index below the span, even past `i64::MAX`.
        self.start.wrapping_add(index as i64)
    }

    fn checked_len(&self) -> Option<usize> {
        if self.end <= self.start {
            return Some(0);
        }
        usize::try_from(self.end.abs_diff(self.start)).ok()
    }
}

/// Walks `start, start + step, ...` while below `end`.
struct ListEnumerator<S: IndexedSource> {
    source: Option<Arc<S>>,
    next: usize,
    end: usize,
    step: usize,
}

impl<S: IndexedSource> PartitionEnumerator<S::Item, usize> for ListEnumerator<S> {
    fn advance(&mut self) -> Result<Advance<S::Item, usize>> {
        let Some(source) = &self.source else {
            return Ok(Advance::Exhausted);
        };
        if self.next >= self.end {
            self.source = None;
            return Ok(Advance::Exhausted);
        }
        let index = self.next;
        self.next = self.next.saturating_add(self.step);
        Ok(Advance::Yielded(source.get(index), index))
    }

    fn dispose(&mut self) -> Result<()> {
        self.source = None;
        Ok(())
    }
}

/// Index window owned by `partition` under the contiguous layout.
pub fn contiguous_range(len: usize, partitions: usize, partition: usize) -> Range<usize> {
    let base = len / partitions;
    let extra = len % partitions;
    let start = partition * base + partition.min(extra);
    let size = base + usize::from(partition < extra);
    start..start + size
}

pub struct ListPartitioner;

impl ListPartitioner {
    /// Build `partitions` enumerators over `source`.
    pub fn partition<S: IndexedSource>(
        source: Arc<S>,
        partitions: usize,
        striped: bool,
    ) -> Result<PartitionedStream<S::Item, usize>> {
        if partitions == 0 {
            return Err(Error::InvalidArgument(
                "partition count must be at least 1".into(),
            ));
        }

        let len = source.checked_len().ok_or_else(|| {
            Error::InvalidArgument("source length does not fit in usize".into())
        })?;
        let enumerators: Vec<BoxEnumerator<S::Item, usize>> = (0..partitions)
            .map(|p| {
                let (next, end, step) = if striped {
                    (p, len, partitions)
                } else {
                    let range = contiguous_range(len, partitions, p);
                    (range.start, range.end, 1)
                };
                Box::new(ListEnumerator {
                    source: Some(Arc::clone(&source)),
                    next,
                    end,
                    step,
                }) as BoxEnumerator<S::Item, usize>
            })
            .collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(len, partitions, striped, "partitioned source");

        PartitionedStream::new(enumerators, KeyComparer::natural())
    }

    /// Partition with the count and layout taken from `config`.
    pub fn from_config<S: IndexedSource>(
        source: Arc<S>,
        config: &EngineConfig,
    ) -> Result<PartitionedStream<S::Item, usize>> {
        Self::partition(source, config.partition_count, config.striped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(stream: PartitionedStream<i64, usize>) -> Vec<Vec<(i64, usize)>> {
        let (parts, _) = stream.into_parts();
        parts
            .into_iter()
            .map(|mut p| {
                let mut out = Vec::new();
                while let Advance::Yielded(v, k) = p.advance().unwrap() {
                    out.push((v, k));
                }
                // No resurrection.
                assert!(p.advance().unwrap().is_exhausted());
                out
            })
            .collect()
    }

    #[test]
    fn contiguous_spreads_remainder_over_leading_partitions() {
        let ranges: Vec<_> = (0..3).map(|p| contiguous_range(10, 3, p)).collect();
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);
        assert_eq!(contiguous_range(2, 4, 3), 2..2);
    }

    #[test]
    fn empty_range_source() {
        assert_eq!(IndexedSource::len(&(5..2i64)), 0);
        let stream = ListPartitioner::partition(Arc::new(5..2i64), 2, true).unwrap();
        assert!(drain(stream).iter().all(Vec::is_empty));
    }
}
