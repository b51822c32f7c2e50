use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use tokio::sync::oneshot;

/// Per-key in-process fan-in: the first requester for a key is elected to
/// generate, everyone else parks on a one-shot channel until [`fulfill`]
/// delivers one result to all of them.
///
/// Electees must always fulfill, including on error; a key with an absent
/// fulfillment keeps its waiters parked.
///
/// [`fulfill`]: SingleFlight::fulfill
pub struct SingleFlight<V> {
    pending: Mutex<HashMap<String, Vec<oneshot::Sender<V>>>>,
}

impl<V> Default for SingleFlight<V> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> SingleFlight<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the fan-in for `key`. Returns `true` iff the caller is the
    /// first — and therefore responsible for generating and fulfilling.
    pub fn request(&self, key: &str, tx: oneshot::Sender<V>) -> bool {
        let mut pending = self.lock_pending();
        match pending.get_mut(key) {
            Some(waiters) => {
                waiters.push(tx);
                false
            }
            None => {
                pending.insert(key.to_owned(), vec![tx]);
                true
            }
        }
    }

    /// Atomically removes the waiter list for `key` and delivers `value` to
    /// every channel on it. Waiters that gave up are skipped silently.
    pub fn fulfill(&self, key: &str, value: V) {
        let waiters = self.lock_pending().remove(key).unwrap_or_default();
        for tx in waiters {
            let _ = tx.send(value.clone());
        }
    }

    fn lock_pending(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, Vec<oneshot::Sender<V>>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn first_requester_is_elected_once_per_generation() {
        let sf = SingleFlight::new();

        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        assert!(sf.request("k", tx1));
        assert!(!sf.request("k", tx2));

        sf.fulfill("k", 7);
        assert_eq!(rx1.await.unwrap(), 7);
        assert_eq!(rx2.await.unwrap(), 7);

        // The key is gone after fulfillment; the next requester is elected.
        let (tx3, _rx3) = oneshot::channel();
        assert!(sf.request("k", tx3));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let sf: SingleFlight<i32> = SingleFlight::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        assert!(sf.request("a", tx1));
        assert!(sf.request("b", tx2));
    }

    #[tokio::test]
    async fn dropped_waiters_do_not_block_delivery() {
        let sf = SingleFlight::new();

        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        sf.request("k", tx1);
        sf.request("k", tx2);
        drop(rx1);

        sf.fulfill("k", "done");
        assert_eq!(rx2.await.unwrap(), "done");
    }
}
