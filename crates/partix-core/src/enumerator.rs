//! The pull contract every pipeline stage implements.
//!
//! Invariants:
//! - once `advance` returns `Exhausted`, every later call returns `Exhausted`;
//! - `dispose` is idempotent and releases a wrapped enumerator exactly once;
//! - an enumerator is driven by exactly one partition worker at a time, so
//!   implementations are `Send` but need not be `Sync`.

use crate::error::Result;

/// Outcome of a single pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance<T, K> {
    Yielded(T, K),
    Exhausted,
}

impl<T, K> Advance<T, K> {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Advance::Exhausted)
    }

    pub fn into_option(self) -> Option<(T, K)> {
        match self {
            Advance::Yielded(item, key) => Some((item, key)),
            Advance::Exhausted => None,
        }
    }
}

pub trait PartitionEnumerator<T, K>: Send {
    /// Pull the next `(element, order key)` pair.
    fn advance(&mut self) -> Result<Advance<T, K>>;

    /// Release upstream resources. Safe to call any number of times.
    fn dispose(&mut self) -> Result<()> {
        Ok(())
    }
}

pub type BoxEnumerator<T, K> = Box<dyn PartitionEnumerator<T, K>>;

impl<T, K> PartitionEnumerator<T, K> for BoxEnumerator<T, K>
where
    T: 'static,
    K: 'static,
{
    fn advance(&mut self) -> Result<Advance<T, K>> {
        (**self).advance()
    }

    fn dispose(&mut self) -> Result<()> {
        (**self).dispose()
    }
}

/// Adapts any `(element, key)` iterator into an enumerator.
pub struct IterEnumerator<I> {
    iter: Option<I>,
}

impl<I> IterEnumerator<I> {
    pub fn new(iter: I) -> Self {
        Self { iter: Some(iter) }
    }
}

impl<T, K, I> PartitionEnumerator<T, K> for IterEnumerator<I>
where
    I: Iterator<Item = (T, K)> + Send,
{
    fn advance(&mut self) -> Result<Advance<T, K>> {
        let next = self.iter.as_mut().and_then(|it| it.next());
        match next {
            Some((item, key)) => Ok(Advance::Yielded(item, key)),
            None => {
                // Drop the iterator so nothing can come back after exhaustion.
                self.iter = None;
                Ok(Advance::Exhausted)
            }
        }
    }

    fn dispose(&mut self) -> Result<()> {
        self.iter = None;
        Ok(())
    }
}

/// Enforces "no resurrection" and at-most-once disposal on an arbitrary enumerator.
pub struct Fuse<T, K> {
    inner: BoxEnumerator<T, K>,
    exhausted: bool,
    disposed: bool,
}

impl<T, K> Fuse<T, K> {
    pub fn new(inner: BoxEnumerator<T, K>) -> Self {
        Self {
            inner,
            exhausted: false,
            disposed: false,
        }
    }
}

impl<T, K> PartitionEnumerator<T, K> for Fuse<T, K>
where
    T: 'static,
    K: 'static,
{
    fn advance(&mut self) -> Result<Advance<T, K>> {
        if self.exhausted || self.disposed {
            return Ok(Advance::Exhausted);
        }
        let next = self.inner.advance()?;
        if next.is_exhausted() {
            self.exhausted = true;
        }
        Ok(next)
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.inner.dispose()
    }
}
