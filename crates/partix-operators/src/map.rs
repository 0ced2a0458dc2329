//! Map stage: projects each element, keeping its order key.

use std::sync::Arc;

use partix_core::enumerator::{Advance, BoxEnumerator, PartitionEnumerator};
use partix_core::error::Result;
use partix_core::stream::PartitionedStream;

pub type Projection<T, U> = Arc<dyn Fn(T) -> U + Send + Sync>;

pub struct MapEnumerator<T, U, K> {
    upstream: BoxEnumerator<T, K>,
    projection: Projection<T, U>,
    exhausted: bool,
    disposed: bool,
}

impl<T, U, K> MapEnumerator<T, U, K> {
    pub fn new(upstream: BoxEnumerator<T, K>, projection: Projection<T, U>) -> Self {
        Self {
            upstream,
            projection,
            exhausted: false,
            disposed: false,
        }
    }
}

impl<T, U, K> PartitionEnumerator<U, K> for MapEnumerator<T, U, K>
where
    T: Send + 'static,
    U: Send + 'static,
    K: Send + 'static,
{
    fn advance(&mut self) -> Result<Advance<U, K>> {
        if self.exhausted || self.disposed {
            return Ok(Advance::Exhausted);
        }
        match self.upstream.advance()? {
            Advance::Yielded(item, key) => Ok(Advance::Yielded((self.projection)(item), key)),
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

pub fn map_stream<T, U, K>(
    stream: PartitionedStream<T, K>,
    projection: impl Fn(T) -> U + Send + Sync + 'static,
) -> Result<PartitionedStream<U, K>>
where
    T: Send + 'static,
    U: Send + 'static,
    K: Send + 'static,
{
    let projection: Projection<T, U> = Arc::new(projection);
    let (parts, comparer) = stream.into_parts();
    let mapped = parts
        .into_iter()
        .map(|p| Box::new(MapEnumerator::new(p, Arc::clone(&projection))) as BoxEnumerator<U, K>)
        .collect();
    PartitionedStream::new(mapped, comparer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_stream;
    use partix_core::enumerator::IterEnumerator;
    use partix_core::stream::KeyComparer;

    #[test]
    fn filter_then_map_keeps_keys() {
        let parts: Vec<BoxEnumerator<i64, usize>> = vec![Box::new(IterEnumerator::new(
            (0..6i64).map(|v| (v, v as usize)),
        ))];
        let stream = PartitionedStream::new(parts, KeyComparer::natural()).unwrap();
        let stream = filter_stream(stream, |v: &i64| v % 2 == 1).unwrap();
        let stream = map_stream(stream, |v: i64| format!("#{v}")).unwrap();

        let (mut parts, _) = stream.into_parts();
        let mut out = Vec::new();
        while let Advance::Yielded(v, k) = parts[0].advance().unwrap() {
            out.push((v, k));
        }
        assert_eq!(
            out,
            vec![("#1".to_string(), 1), ("#3".to_string(), 3), ("#5".to_string(), 5)]
        );
        parts[0].dispose().unwrap();
        parts[0].dispose().unwrap();
    }
}
