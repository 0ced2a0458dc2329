use std::hash::{BuildHasher, Hash};
use std::iter::Flatten;
use std::vec::IntoIter;

use partix_core::enumerator::{Advance, PartitionEnumerator};
use partix_core::error::Result;

use super::{Hashed, ShuffleInput};

/// Output partition of an unordered shuffle.
pub struct HashRepartitionEnumerator<T, K, H, S> {
    shuffle: ShuffleInput<T, K, H, S, Hashed<T, H>>,
    cells: Option<Flatten<IntoIter<Vec<Hashed<T, H>>>>>,
    exhausted: bool,
}

impl<T, K, H, S> HashRepartitionEnumerator<T, K, H, S> {
    pub(crate) fn new(shuffle: ShuffleInput<T, K, H, S, Hashed<T, H>>) -> Self {
        Self {
            shuffle,
            cells: None,
            exhausted: false,
        }
    }
}

impl<T, K, H, S> PartitionEnumerator<Hashed<T, H>, ()> for HashRepartitionEnumerator<T, K, H, S>
where
    T: Send + 'static,
    K: Send + 'static,
    H: Hash + Send + 'static,
    S: BuildHasher + Send + 'static,
{
    fn advance(&mut self) -> Result<Advance<Hashed<T, H>, ()>> {
        if self.exhausted {
            return Ok(Advance::Exhausted);
        }
        if self.cells.is_none() {
            let cells = self.shuffle.exchange(|hashed, _key| hashed, |_| {})?;
            self.cells = Some(cells.into_iter().flatten());
        }
        match self.cells.as_mut().and_then(Iterator::next) {
            Some(item) => Ok(Advance::Yielded(item, ())),
            None => {
                self.exhausted = true;
                self.cells = None;
                Ok(Advance::Exhausted)
            }
        }
    }

    fn dispose(&mut self) -> Result<()> {
        self.exhausted = true;
        self.cells = None;
        self.shuffle.dispose()
    }
}
