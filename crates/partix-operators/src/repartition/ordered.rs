use std::hash::{BuildHasher, Hash};

use partix_core::enumerator::{Advance, PartitionEnumerator};
use partix_core::error::Result;
use partix_core::merge::KWayMerge;
use partix_core::stream::KeyComparer;

use super::{Hashed, ShuffleInput};

/// Output partition of an order-preserving shuffle.
///
/// Producers sort their cells before publishing, so the read phase only has
/// to merge N sorted cells.
pub struct OrderedHashRepartitionEnumerator<T, K, H, S> {
    shuffle: ShuffleInput<T, K, H, S, (Hashed<T, H>, K)>,
    comparer: KeyComparer<K>,
    merge: Option<KWayMerge<Hashed<T, H>, K>>,
    exhausted: bool,
}

impl<T, K, H, S> OrderedHashRepartitionEnumerator<T, K, H, S> {
    pub(crate) fn new(
        shuffle: ShuffleInput<T, K, H, S, (Hashed<T, H>, K)>,
        comparer: KeyComparer<K>,
    ) -> Self {
        Self {
            shuffle,
            comparer,
            merge: None,
            exhausted: false,
        }
    }
}

impl<T, K, H, S> PartitionEnumerator<Hashed<T, H>, K> for OrderedHashRepartitionEnumerator<T, K, H, S>
where
    T: Send + 'static,
    K: Send + 'static,
    H: Hash + Send + 'static,
    S: BuildHasher + Send + 'static,
{
    fn advance(&mut self) -> Result<Advance<Hashed<T, H>, K>> {
        if self.exhausted {
            return Ok(Advance::Exhausted);
        }
        if self.merge.is_none() {
            let comparer = self.comparer.clone();
            let cells = self.shuffle.exchange(
                |hashed, key| (hashed, key),
                |row| {
                    for cell in row.iter_mut() {
                        cell.sort_by(|a, b| comparer.compare(&a.1, &b.1));
                    }
                },
            )?;
            self.merge = Some(KWayMerge::new(cells, self.comparer.clone()));
        }
        match self.merge.as_mut().and_then(Iterator::next) {
            Some((item, key)) => Ok(Advance::Yielded(item, key)),
            None => {
                self.exhausted = true;
                self.merge = None;
                Ok(Advance::Exhausted)
            }
        }
    }

    fn dispose(&mut self) -> Result<()> {
        self.exhausted = true;
        self.merge = None;
        self.shuffle.dispose()
    }
}
