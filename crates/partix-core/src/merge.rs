//! Lazy k-way merge of runs that are each sorted by order key.

use crate::producer::{Producer, ProducerHeap};
use crate::stream::KeyComparer;

/// Merges `runs` (each ascending under `comparer`) into one ascending sequence.
///
/// Equal keys come out in run order, so the merge is stable with respect to
/// the run index.
pub struct KWayMerge<T, K> {
    runs: Vec<std::vec::IntoIter<(T, K)>>,
    heads: Vec<Option<T>>,
    heap: ProducerHeap<K>,
}

impl<T, K> KWayMerge<T, K> {
    pub fn new(runs: Vec<Vec<(T, K)>>, comparer: KeyComparer<K>) -> Self {
        let mut runs: Vec<_> = runs.into_iter().map(Vec::into_iter).collect();
        let mut heads = Vec::with_capacity(runs.len());
        let mut heap = ProducerHeap::with_capacity(comparer, runs.len());
        for (index, run) in runs.iter_mut().enumerate() {
            match run.next() {
                Some((item, key)) => {
                    heads.push(Some(item));
                    heap.push(Producer::new(key, index));
                }
                None => heads.push(None),
            }
        }
        Self { runs, heads, heap }
    }

    /// Stable-sort each run by `comparer`, then merge.
    pub fn from_unsorted(mut runs: Vec<Vec<(T, K)>>, comparer: KeyComparer<K>) -> Self {
        for run in &mut runs {
            run.sort_by(|a, b| comparer.compare(&a.1, &b.1));
        }
        Self::new(runs, comparer)
    }
}

impl<T, K> Iterator for KWayMerge<T, K> {
    type Item = (T, K);

    fn next(&mut self) -> Option<(T, K)> {
        let Producer { key, partition } = self.heap.pop()?;
        let item = self.heads[partition].take()?;
        if let Some((next_item, next_key)) = self.runs[partition].next() {
            self.heads[partition] = Some(next_item);
            self.heap.push(Producer::new(next_key, partition));
        }
        Some((item, key))
    }
}
