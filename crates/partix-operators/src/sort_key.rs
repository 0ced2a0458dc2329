//! Sort-key adapter: re-keys elements for an ordering stage.
//!
//! Each advance pulls exactly one upstream element and replaces its order key
//! with `selector(&element)`. Nothing is buffered or reordered, so "position
//! in source" and "value used for ordering" stay decoupled.

use std::sync::Arc;

use partix_core::enumerator::{Advance, BoxEnumerator, PartitionEnumerator};
use partix_core::error::Result;
use partix_core::stream::{KeyComparer, PartitionedStream};

pub type KeySelector<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

pub struct SortKeyEnumerator<T, K1, K2> {
    upstream: BoxEnumerator<T, K1>,
    selector: KeySelector<T, K2>,
    exhausted: bool,
    disposed: bool,
}

impl<T, K1, K2> SortKeyEnumerator<T, K1, K2> {
    pub fn new(upstream: BoxEnumerator<T, K1>, selector: KeySelector<T, K2>) -> Self {
        Self {
            upstream,
            selector,
            exhausted: false,
            disposed: false,
        }
    }
}

impl<T, K1, K2> PartitionEnumerator<T, K2> for SortKeyEnumerator<T, K1, K2>
where
    T: Send + 'static,
    K1: Send + 'static,
    K2: Send + 'static,
{
    fn advance(&mut self) -> Result<Advance<T, K2>> {
        if self.exhausted || self.disposed {
            return Ok(Advance::Exhausted);
        }
        match self.upstream.advance()? {
            Advance::Yielded(item, _) => {
                let key = (self.selector)(&item);
                Ok(Advance::Yielded(item, key))
            }
            Advance::Exhausted => {
                self.exhausted = true;
                Ok(Advance::Exhausted)
            }
        }
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.upstream.dispose()
    }
}

/// Re-key every partition of `stream` with `selector`; `comparer` orders the new keys.
pub fn sort_key_stream<T, K1, K2>(
    stream: PartitionedStream<T, K1>,
    selector: impl Fn(&T) -> K2 + Send + Sync + 'static,
    comparer: KeyComparer<K2>,
) -> Result<PartitionedStream<T, K2>>
where
    T: Send + 'static,
    K1: Send + 'static,
    K2: Send + 'static,
{
    let selector: KeySelector<T, K2> = Arc::new(selector);
    let (parts, _) = stream.into_parts();
    let rekeyed = parts
        .into_iter()
        .map(|upstream| {
            Box::new(SortKeyEnumerator::new(upstream, Arc::clone(&selector)))
                as BoxEnumerator<T, K2>
        })
        .collect();
    PartitionedStream::new(rekeyed, comparer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use partix_core::enumerator::IterEnumerator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        pulls: Arc<AtomicUsize>,
        disposals: Arc<AtomicUsize>,
        items: std::vec::IntoIter<(&'static str, usize)>,
    }

    impl PartitionEnumerator<&'static str, usize> for Counting {
        fn advance(&mut self) -> Result<Advance<&'static str, usize>> {
            self.pulls.fetch_add(1, Ordering::SeqCst);
            Ok(match self.items.next() {
                Some((v, k)) => Advance::Yielded(v, k),
                None => Advance::Exhausted,
            })
        }

        fn dispose(&mut self) -> Result<()> {
            self.disposals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn one_pull_per_advance_and_single_dispose() {
        let pulls = Arc::new(AtomicUsize::new(0));
        let disposals = Arc::new(AtomicUsize::new(0));
        let upstream: BoxEnumerator<&'static str, usize> = Box::new(Counting {
            pulls: Arc::clone(&pulls),
            disposals: Arc::clone(&disposals),
            items: vec![("pear", 0), ("fig", 1)].into_iter(),
        });
        let selector: KeySelector<&'static str, usize> = Arc::new(|s: &&'static str| s.len());
        let mut e = SortKeyEnumerator::new(upstream, selector);

        assert_eq!(e.advance().unwrap(), Advance::Yielded("pear", 4));
        assert_eq!(pulls.load(Ordering::SeqCst), 1);
        assert_eq!(e.advance().unwrap(), Advance::Yielded("fig", 3));
        assert!(e.advance().unwrap().is_exhausted());
        assert!(e.advance().unwrap().is_exhausted());
        assert_eq!(pulls.load(Ordering::SeqCst), 3);

        e.dispose().unwrap();
        e.dispose().unwrap();
        assert_eq!(disposals.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rekeys_whole_stream() {
        let parts: Vec<BoxEnumerator<i64, usize>> = vec![
            Box::new(IterEnumerator::new(vec![(3i64, 0usize), (-8, 1)].into_iter())),
            Box::new(IterEnumerator::new(vec![(5i64, 2usize)].into_iter())),
        ];
        let stream = PartitionedStream::new(parts, KeyComparer::natural()).unwrap();
        let rekeyed = sort_key_stream(stream, |v: &i64| v.abs(), KeyComparer::natural()).unwrap();
        let (mut parts, _) = rekeyed.into_parts();
        assert_eq!(parts[0].advance().unwrap(), Advance::Yielded(3, 3));
        assert_eq!(parts[0].advance().unwrap(), Advance::Yielded(-8, 8));
        assert_eq!(parts[1].advance().unwrap(), Advance::Yielded(5, 5));
    }
}
