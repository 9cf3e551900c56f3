//! Single-flight coordination: one in-flight operation, many waiters.
//!
//! DESIGN
//! ======
//! The slot is either `Idle` or `InFlight(waiters)`. The first caller to find
//! it idle becomes the leader and runs the work; callers arriving while the
//! work is running park on a `oneshot` receiver. When the leader finishes it
//! swaps the slot back to `Idle` and sends a clone of the result to every
//! waiter, in arrival order, inside the same critical section, so the waiter
//! list is always empty once the slot reads `Idle`.
//!
//! If the leader's future is dropped before finishing, the slot is reset and
//! the waiters' senders are dropped; they observe `None`.

#[cfg(test)]
#[path = "single_flight_test.rs"]
mod tests;

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

enum Slot<T> {
    Idle,
    InFlight(Vec<oneshot::Sender<T>>),
}

pub struct SingleFlight<T> {
    slot: Mutex<Slot<T>>,
}

enum Role<T> {
    Leader,
    Waiter(oneshot::Receiver<T>),
}

impl<T: Clone> SingleFlight<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { slot: Mutex::new(Slot::Idle) }
    }

    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(*self.lock(), Slot::InFlight(_))
    }

    /// Number of callers parked behind the current leader.
    #[must_use]
    pub fn waiting(&self) -> usize {
        match &*self.lock() {
            Slot::Idle => 0,
            Slot::InFlight(waiters) => waiters.len(),
        }
    }

    /// Run `work` unless another caller already is, in which case wait for
    /// its result.
    ///
    /// `ready` is consulted under the slot lock when the slot is idle; if it
    /// yields a value, that value is returned and no work starts. Returns
    /// `None` only when this caller waited on a leader that was dropped.
    pub async fn run<R, F, Fut>(&self, ready: R, work: F) -> Option<T>
    where
        R: FnOnce() -> Option<T>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let role = {
            let mut slot = self.lock();
            match &mut *slot {
                Slot::InFlight(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Role::Waiter(rx)
                }
                Slot::Idle => {
                    if let Some(value) = ready() {
                        return Some(value);
                    }
                    *slot = Slot::InFlight(Vec::new());
                    Role::Leader
                }
            }
        };

        match role {
            Role::Waiter(rx) => rx.await.ok(),
            Role::Leader => {
                let guard = LeaderGuard { flight: self, finished: false };
                let value = work().await;
                guard.finish(&value);
                Some(value)
            }
        }
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct LeaderGuard<'a, T: Clone> {
    flight: &'a SingleFlight<T>,
    finished: bool,
}

impl<T: Clone> LeaderGuard<'_, T> {
    fn finish(mut self, value: &T) {
        let mut slot = self.flight.lock();
        if let Slot::InFlight(waiters) = std::mem::replace(&mut *slot, Slot::Idle) {
            for tx in waiters {
                // A waiter that gave up has dropped its receiver.
                let _ = tx.send(value.clone());
            }
        }
        self.finished = true;
    }
}

impl<T: Clone> Drop for LeaderGuard<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            *self.flight.lock() = Slot::Idle;
        }
    }
}
