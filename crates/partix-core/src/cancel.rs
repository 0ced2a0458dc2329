//! Cooperative cancellation.
//!
//! Tokens are polled, never preemptive. A child token reports cancellation
//! when either it or any ancestor was cancelled, which lets an operator stop
//! sibling partitions after a local failure without touching the caller's
//! token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

struct TokenInner {
    cancelled: AtomicBool,
    parent: Option<Arc<TokenInner>>,
}

impl TokenInner {
    fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.is_cancelled(),
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// A token that is cancelled when `self` is, and can also be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.inner)),
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// `Err(Error::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Counts elements and polls a token every `interval` of them.
#[derive(Debug)]
pub struct CancelPoll {
    token: CancellationToken,
    interval: usize,
    seen: usize,
}

impl CancelPoll {
    pub fn new(token: CancellationToken, interval: usize) -> Self {
        Self {
            token,
            interval: interval.max(1),
            seen: 0,
        }
    }

    /// Record one element; polls the token when the cadence is reached.
    #[inline]
    pub fn tick(&mut self) -> Result<()> {
        self.seen += 1;
        if self.seen % self.interval == 0 {
            self.token.check()?;
        }
        Ok(())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
