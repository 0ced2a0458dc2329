//! Filter stage: drops elements that fail a predicate, keeping order keys.

use std::sync::Arc;

use partix_core::enumerator::{Advance, BoxEnumerator, PartitionEnumerator};
use partix_core::error::Result;
use partix_core::stream::PartitionedStream;

pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

pub struct FilterEnumerator<T, K> {
    upstream: BoxEnumerator<T, K>,
    predicate: Predicate<T>,
    exhausted: bool,
    disposed: bool,
}

impl<T, K> FilterEnumerator<T, K> {
    pub fn new(upstream: BoxEnumerator<T, K>, predicate: Predicate<T>) -> Self {
        Self {
            upstream,
            predicate,
            exhausted: false,
            disposed: false,
        }
    }
}

impl<T, K> PartitionEnumerator<T, K> for FilterEnumerator<T, K>
where
    T: Send + 'static,
    K: Send + 'static,
{
    fn advance(&mut self) -> Result<Advance<T, K>> {
        if self.exhausted || self.disposed {
            return Ok(Advance::Exhausted);
        }
        loop {
            match self.upstream.advance()? {
                Advance::Yielded(item, key) => {
                    if (self.predicate)(&item) {
                        return Ok(Advance::Yielded(item, key));
                    }
                }
                Advance::Exhausted => {
                    self.exhausted = true;
                    return Ok(Advance::Exhausted);
                }
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

pub fn filter_stream<T, K>(
    stream: PartitionedStream<T, K>,
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> Result<PartitionedStream<T, K>>
where
    T: Send + 'static,
    K: Send + 'static,
{
    let predicate: Predicate<T> = Arc::new(predicate);
    let (parts, comparer) = stream.into_parts();
    let filtered = parts
        .into_iter()
        .map(|p| Box::new(FilterEnumerator::new(p, Arc::clone(&predicate))) as BoxEnumerator<T, K>)
        .collect();
    PartitionedStream::new(filtered, comparer)
}
