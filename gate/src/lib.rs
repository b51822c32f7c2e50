//! Building blocks to limit concurrency.
//!
//! A [`Gate`] admits up to `max_inflight` concurrent holders and parks up to
//! `max_wait` additional reservations in a FIFO queue. Anything beyond that is
//! refused outright so callers can shed load instead of piling up.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use tokio::sync::oneshot;

/// Concurrency limiter with a bounded wait queue.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<Inner>,
}

struct Inner {
    max_inflight: usize,
    max_wait: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// Number of outstanding reservations, granted or queued.
    num: usize,
    queue: VecDeque<oneshot::Sender<()>>,
}

impl Gate {
    pub fn new(max_inflight: usize, max_wait: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_inflight,
                max_wait,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Attempts to obtain a reservation. Returns `None` when the wait queue is
    /// already full.
    pub fn reserve(&self) -> Option<Reservation> {
        let mut state = self.inner.lock_state();

        if state.num >= self.inner.max_inflight + self.inner.max_wait {
            return None;
        }
        state.num += 1;

        // Grant immediately when an inflight slot is free.
        if state.num <= self.inner.max_inflight {
            return Some(Reservation {
                inner: Arc::clone(&self.inner),
                granted: None,
            });
        }

        // Grant later, in FIFO order, as releases come in.
        let (tx, rx) = oneshot::channel();
        state.queue.push_back(tx);
        Some(Reservation {
            inner: Arc::clone(&self.inner),
            granted: Some(rx),
        })
    }
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, held_slot: bool) {
        let mut state = self.lock_state();
        state.num -= 1;

        // A reservation abandoned while still queued frees no inflight
        // slot, so promoting a waiter for it would overshoot the limit.
        if !held_slot {
            return;
        }

        // Promote the first waiter still interested in its slot.
        while let Some(tx) = state.queue.pop_front() {
            if tx.send(()).is_ok() {
                break;
            }
        }
    }
}

/// A slot in the gate. Dropping the reservation returns the slot and promotes
/// the next queued waiter, so it cannot leak on early-return paths.
pub struct Reservation {
    inner: Arc<Inner>,
    granted: Option<oneshot::Receiver<()>>,
}

impl Reservation {
    /// Blocks until the number of inflight holders is below the maximum.
    /// Returns immediately when the reservation was granted on reserve.
    pub async fn wait(&mut self) {
        if let Some(rx) = self.granted.take() {
            // A closed channel means the gate itself went away; treat the
            // slot as granted rather than park forever.
            let _ = rx.await;
        }
    }

    #[cfg(test)]
    fn is_granted(&mut self) -> bool {
        use tokio::sync::oneshot::error::TryRecvError;

        match &mut self.granted {
            None => true,
            Some(rx) => match rx.try_recv() {
                Ok(()) | Err(TryRecvError::Closed) => {
                    self.granted = None;
                    true
                }
                Err(TryRecvError::Empty) => false,
            },
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        let held_slot = match &mut self.granted {
            // Granted on reserve, or the grant was consumed by wait().
            None => true,
            // The grant may have raced in without a wait() call.
            Some(rx) => matches!(rx.try_recv(), Ok(())),
        };
        self.inner.release(held_slot);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::AtomicI32;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use rand::Rng;

    use super::*;

    #[tokio::test]
    async fn grants_inflight_then_queues_then_refuses() {
        let gate = Gate::new(4, 2);

        let mut rs = Vec::new();
        for i in 0..6 {
            let mut r = gate.reserve().unwrap_or_else(|| panic!("#{i} refused"));
            // The first 4 reservations are granted on reserve.
            assert_eq!(r.is_granted(), i < 4, "#{i}");
            rs.push(r);
        }

        // Reserved at maximum. Further attempts are refused.
        for _ in 0..6 {
            assert!(gate.reserve().is_none());
        }

        // Wait returns immediately for already-granted reservations.
        for r in rs.iter_mut().take(4) {
            r.wait().await;
        }

        // Release one, the first queued waiter gets the slot.
        drop(rs.remove(0));
        rs[3].wait().await;

        // One queue slot freed up again.
        let mut extra = gate.reserve().unwrap_or_else(|| panic!("refused after release"));
        assert!(!extra.is_granted());

        // Each further release grants the next waiter in FIFO order.
        drop(rs.remove(0));
        rs[3].wait().await;
        drop(rs.remove(0));
        extra.wait().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_inflight_limit() {
        const MAX: usize = 10;

        let gate = Gate::new(MAX, MAX);
        let inflight = Arc::new(AtomicI32::new(0));

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let gate = gate.clone();
            let inflight = Arc::clone(&inflight);
            tasks.push(tokio::spawn(async move {
                let mut done = 0;
                while done < 100 {
                    let us = rand::rng().random_range(0..200);
                    let Some(mut r) = gate.reserve() else {
                        tokio::time::sleep(Duration::from_micros(us)).await;
                        continue;
                    };

                    r.wait().await;
                    assert!(inflight.fetch_add(1, Ordering::SeqCst) < MAX as i32);
                    tokio::time::sleep(Duration::from_micros(us)).await;
                    inflight.fetch_sub(1, Ordering::SeqCst);
                    drop(r);
                    done += 1;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn dropping_a_queued_reservation_frees_its_slot() {
        let gate = Gate::new(1, 2);

        let _held = gate.reserve().unwrap();
        let queued = gate.reserve().unwrap();
        let mut last = gate.reserve().unwrap();
        assert!(gate.reserve().is_none());

        // Abandon the middle waiter; its queue entry must not absorb a grant.
        drop(queued);
        drop(_held);
        last.wait().await;
    }
}
