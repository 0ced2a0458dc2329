//! All-to-all exchange between N producers and N consumers.
//!
//! Cell [i][j] carries what producer i routed to consumer j. While hashing,
//! producer i owns its N cells outright (`ExchangeWriter`). `publish` moves
//! every cell into its slot and counts the barrier down; a consumer
//! (`ExchangeReader`) may only take its column once all N producers have
//! published. Each slot is written once and taken once, so the slot mutexes
//! only ever serve as the hand-off point and never see contention.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use partix_core::cancel::CancellationToken;
use partix_core::error::{Error, Result};

/// How often a blocked consumer re-checks its cancellation token.
const BARRIER_POLL: Duration = Duration::from_millis(5);

struct LatchState {
    remaining: usize,
    aborted: Option<String>,
}

/// One-shot countdown barrier. A fresh latch is created per exchange.
pub(crate) struct CountdownLatch {
    state: Mutex<LatchState>,
    released: Condvar,
}

impl CountdownLatch {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(LatchState {
                remaining: count,
                aborted: None,
            }),
            released: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, LatchState>> {
        self.state
            .lock()
            .map_err(|_| Error::Invariant("exchange latch poisoned".into()))
    }

    pub(crate) fn count_down(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.remaining = state
            .remaining
            .checked_sub(1)
            .ok_or_else(|| Error::Invariant("exchange latch counted down too often".into()))?;
        if state.remaining == 0 {
            self.released.notify_all();
        }
        Ok(())
    }

    /// Release every waiter with a failure. The first reason wins.
    pub(crate) fn abort(&self, reason: String) {
        // A poisoned latch already fails every waiter.
        if let Ok(mut state) = self.state.lock() {
            state.aborted.get_or_insert(reason);
            self.released.notify_all();
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.remaining == 0 && s.aborted.is_none())
            .unwrap_or(false)
    }

    /// Block until every producer counted down, the exchange was aborted, or
    /// `cancel` fired.
    pub(crate) fn wait(&self, cancel: &CancellationToken) -> Result<()> {
        let mut state = self.lock()?;
        loop {
            cancel.check()?;
            if let Some(reason) = &state.aborted {
                return Err(Error::ExchangeAborted(reason.clone()));
            }
            if state.remaining == 0 {
                return Ok(());
            }
            let (guard, _) = self
                .released
                .wait_timeout(state, BARRIER_POLL)
                .map_err(|_| Error::Invariant("exchange latch poisoned".into()))?;
            state = guard;
        }
    }
}

struct Shared<C> {
    partitions: usize,
    /// Row-major: slot `i * partitions + j` is cell [i][j].
    slots: Vec<Mutex<Option<Vec<C>>>>,
    latch: CountdownLatch,
}

/// Build an exchange for `partitions` producers and consumers.
pub fn exchange<C: Send>(partitions: usize) -> (Vec<ExchangeWriter<C>>, Vec<ExchangeReader<C>>) {
    let shared = Arc::new(Shared {
        partitions,
        slots: (0..partitions * partitions)
            .map(|_| Mutex::new(None))
            .collect(),
        latch: CountdownLatch::new(partitions),
    });
    let writers = (0..partitions)
        .map(|row| ExchangeWriter {
            row,
            cells: (0..partitions).map(|_| Vec::new()).collect(),
            shared: Arc::clone(&shared),
            published: false,
        })
        .collect();
    let readers = (0..partitions)
        .map(|column| ExchangeReader {
            column,
            shared: Arc::clone(&shared),
        })
        .collect();
    (writers, readers)
}

/// Producer side: exclusive owner of row `row` until `publish`.
pub struct ExchangeWriter<C> {
    row: usize,
    cells: Vec<Vec<C>>,
    shared: Arc<Shared<C>>,
    published: bool,
}

impl<C> ExchangeWriter<C> {
    pub fn row(&self) -> usize {
        self.row
    }

    /// Append `item` to the cell destined for consumer `dest`.
    pub fn push(&mut self, dest: usize, item: C) {
        self.cells[dest].push(item);
    }

    pub fn cells_mut(&mut self) -> &mut [Vec<C>] {
        &mut self.cells
    }

    pub fn buffered(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Hand every cell to its consumer and arrive at the barrier.
    pub fn publish(mut self) -> Result<()> {
        let cells = std::mem::take(&mut self.cells);
        for (column, cell) in cells.into_iter().enumerate() {
            let slot = &self.shared.slots[self.row * self.shared.partitions + column];
            let mut slot = slot
                .lock()
                .map_err(|_| Error::Invariant("exchange slot poisoned".into()))?;
            if slot.replace(cell).is_some() {
                return Err(Error::Invariant(format!(
                    "exchange cell [{}][{}] written twice",
                    self.row, column
                )));
            }
        }
        self.published = true;
        self.shared.latch.count_down()
    }

    /// Give up without publishing; every consumer fails with `ExchangeAborted`.
    pub fn abort(mut self, reason: impl Into<String>) {
        self.published = true;
        self.shared.latch.abort(reason.into());
    }
}

impl<C> Drop for ExchangeWriter<C> {
    fn drop(&mut self) {
        if !self.published {
            self.shared.latch.abort(format!(
                "producer {} dropped before publishing",
                self.row
            ));
        }
    }
}

/// Consumer side: takes column `column` once the barrier releases.
pub struct ExchangeReader<C> {
    column: usize,
    shared: Arc<Shared<C>>,
}

impl<C> ExchangeReader<C> {
    pub fn column(&self) -> usize {
        self.column
    }

    /// True once every producer published (non-blocking).
    pub fn is_released(&self) -> bool {
        self.shared.latch.is_released()
    }

    /// Wait for the barrier, then take cells [0][column] .. [N-1][column] in
    /// producer order.
    pub fn take(self, cancel: &CancellationToken) -> Result<Vec<Vec<C>>> {
        self.shared.latch.wait(cancel)?;
        let n = self.shared.partitions;
        let mut cells = Vec::with_capacity(n);
        for row in 0..n {
            let slot = &self.shared.slots[row * n + self.column];
            let cell = slot
                .lock()
                .map_err(|_| Error::Invariant("exchange slot poisoned".into()))?
                .take()
                .ok_or_else(|| {
                    Error::Invariant(format!(
                        "exchange cell [{}][{}] missing after barrier",
                        row, self.column
                    ))
                })?;
            cells.push(cell);
        }
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn cells_arrive_in_producer_order() {
        let (writers, readers) = exchange::<(usize, u32)>(3);
        thread::scope(|s| {
            for mut w in writers {
                s.spawn(move || {
                    let row = w.row();
                    for dest in 0..3 {
                        w.push(dest, (row, dest as u32));
                    }
                    w.publish().unwrap();
                });
            }
        });
        let cancel = CancellationToken::new();
        for r in readers {
            let column = r.column();
            assert!(r.is_released());
            let cells = r.take(&cancel).unwrap();
            let rows: Vec<usize> = cells.iter().map(|c| c[0].0).collect();
            assert_eq!(rows, vec![0, 1, 2]);
            assert!(cells.iter().all(|c| c[0].1 as usize == column));
        }
    }

    #[test]
    fn dropped_writer_aborts_waiters() {
        let (mut writers, mut readers) = exchange::<u8>(2);
        let w1 = writers.pop().unwrap();
        let w0 = writers.pop().unwrap();
        w0.publish().unwrap();
        drop(w1);
        let err = readers.pop().unwrap().take(&CancellationToken::new()).unwrap_err();
        assert!(matches!(err, Error::ExchangeAborted(_)));
    }

    #[test]
    fn waiting_reader_observes_cancellation() {
        let (writers, mut readers) = exchange::<u8>(2);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = readers.pop().unwrap().take(&cancel).unwrap_err();
        assert!(err.is_cancelled());
        drop(writers);
    }
}
