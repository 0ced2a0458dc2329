//! Merge bookkeeping: which partition can contribute the next-smallest key.
//!
//! A `ProducerHeap` is local state owned by one merge, so any number of merges
//! may run side by side.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::stream::KeyComparer;

/// Immutable `(key, originating partition)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Producer<K> {
    /// Latest key observed from `partition` (its current head).
    pub key: K,
    pub partition: usize,
}

impl<K> Producer<K> {
    pub fn new(key: K, partition: usize) -> Self {
        Self { key, partition }
    }
}

/// Heap entry: a producer plus the comparer that orders it.
///
/// Ordered by key (reversed for min-heap behavior), then by partition.
struct HeapEntry<K> {
    producer: Producer<K>,
    comparer: KeyComparer<K>,
}

impl<K> PartialEq for HeapEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K> Eq for HeapEntry<K> {}

impl<K> PartialOrd for HeapEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for HeapEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparer
            .compare(&other.producer.key, &self.producer.key)
            .then_with(|| other.producer.partition.cmp(&self.producer.partition))
    }
}

/// Min-heap of producers ordered by the stream comparer.
///
/// Equal keys pop in ascending partition order, which keeps merges stable.
pub struct ProducerHeap<K> {
    heap: BinaryHeap<HeapEntry<K>>,
    comparer: KeyComparer<K>,
}

impl<K> ProducerHeap<K> {
    pub fn new(comparer: KeyComparer<K>) -> Self {
        Self::with_capacity(comparer, 0)
    }

    pub fn with_capacity(comparer: KeyComparer<K>, capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            comparer,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn peek(&self) -> Option<&Producer<K>> {
        self.heap.peek().map(|entry| &entry.producer)
    }

    pub fn push(&mut self, producer: Producer<K>) {
        self.heap.push(HeapEntry {
            producer,
            comparer: self.comparer.clone(),
        });
    }

    pub fn pop(&mut self) -> Option<Producer<K>> {
        self.heap.pop().map(|entry| entry.producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_smallest_key_then_lowest_partition() {
        let mut heap = ProducerHeap::new(KeyComparer::<u32>::natural());
        for (key, partition) in [(5, 0), (1, 3), (5, 1), (0, 2), (1, 0)] {
            heap.push(Producer::new(key, partition));
        }
        let order: Vec<(u32, usize)> = std::iter::from_fn(|| heap.pop())
            .map(|p| (p.key, p.partition))
            .collect();
        assert_eq!(order, vec![(0, 2), (1, 0), (1, 3), (5, 0), (5, 1)]);
    }

    #[test]
    fn equal_keys_pop_in_partition_order() {
        let mut heap = ProducerHeap::with_capacity(KeyComparer::<u8>::natural(), 16);
        for partition in [9, 3, 15, 0, 7, 12, 1, 4, 14, 2, 8, 11, 5, 13, 6, 10] {
            heap.push(Producer::new(0, partition));
        }
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop())
            .map(|p| p.partition)
            .collect();
        assert_eq!(order, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn honours_custom_comparer() {
        let mut heap = ProducerHeap::new(KeyComparer::<i32>::natural().reversed());
        for (i, key) in [3, 9, -1, 4].into_iter().enumerate() {
            heap.push(Producer::new(key, i));
        }
        assert_eq!(heap.peek().map(|p| p.key), Some(9));
        assert_eq!(heap.len(), 4);
        let keys: Vec<i32> = std::iter::from_fn(|| heap.pop()).map(|p| p.key).collect();
        assert_eq!(keys, vec![9, 4, 3, -1]);
        assert!(heap.is_empty());
    }
}
