//! Admission control for in-flight requests.
//!
//! A monitor guarding two counters, `active` and `done`, with two wait predicates: producers wait
//! for `active < limit` and the final join waits for `done == n`. Slots are handed out as
//! [`AdmissionSlot`] guards and released when the guard is dropped, so every acquired slot is
//! released exactly once on every path, unwinding included.
use std::num::NonZeroUsize;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
#[allow(unused)]
use tracing::{debug, error, trace};

#[derive(Debug)]
pub struct AdmissionController {
    limit: NonZeroUsize,
    state: Mutex<AdmissionSnapshot>,
    changed: Notify,
}

/// Point-in-time view of the controller's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionSnapshot {
    pub active: usize,
    pub done: usize,
    pub acquired: usize,
    pub released: usize,
    /// Highest `active` value observed.
    pub peak_active: usize,
}

impl AdmissionController {
    pub fn new(limit: NonZeroUsize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            state: Mutex::new(AdmissionSnapshot::default()),
            changed: Notify::new(),
        })
    }

    pub fn limit(&self) -> NonZeroUsize {
        self.limit
    }

    /// Wait until fewer than `limit` requests are in flight and take a slot.
    pub async fn acquire(self: &Arc<Self>) -> AdmissionSlot {
        loop {
            // NOTE: Register interest before checking so a release between the check and the
            // await still wakes us.
            let mut notified = pin!(self.changed.notified());
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if state.active < self.limit.get() {
                    state.active += 1;
                    state.acquired += 1;
                    state.peak_active = state.peak_active.max(state.active);
                    trace!("Slot acquired, {} active", state.active);
                    return AdmissionSlot {
                        controller: Arc::clone(self),
                    };
                }
            }

            notified.await;
        }
    }

    /// Wait until `n` slots have been released.
    pub async fn await_all(&self, n: usize) {
        loop {
            let mut notified = pin!(self.changed.notified());
            notified.as_mut().enable();

            {
                let state = self.lock();
                if state.done >= n {
                    if state.done > n {
                        error!("{} requests completed but only {n} were expected", state.done);
                    }
                    return;
                }
            }

            notified.await;
        }
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        *self.lock()
    }

    fn release(&self) {
        {
            let mut state = self.lock();
            if state.active == 0 {
                error!("Released a slot with nothing in flight. This is a bug in gauntlet.");
            }
            state.active = state.active.saturating_sub(1);
            state.done += 1;
            state.released += 1;
        }
        self.changed.notify_waiters();
    }

    // Counters are only ever mutated in small non-panicking sections, so a poisoned lock still
    // holds consistent data.
    fn lock(&self) -> MutexGuard<'_, AdmissionSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One admitted request. Dropping the slot releases it.
#[must_use = "dropping the slot releases it immediately"]
#[derive(Debug)]
pub struct AdmissionSlot {
    controller: Arc<AdmissionController>,
}

impl AdmissionSlot {
    /// Release the slot now. Equivalent to dropping it.
    pub fn release(self) {}
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.controller.release();
    }
}
