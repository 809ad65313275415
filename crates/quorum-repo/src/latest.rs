use std::fmt;

use tokio::sync::watch;

/// Receiving end of a [`Latest`] stream.
///
/// [`borrow`](watch::Receiver::borrow) yields the current value right away;
/// [`changed`](watch::Receiver::changed) waits for the next publication.
pub type LatestReceiver<T> = watch::Receiver<T>;

/// Latest-value cache with multicast: replays the current value to every new
/// subscriber.
///
/// Only the newest value is retained, so a slow reader that misses several
/// publications sees just the last one.
pub struct Latest<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Latest<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the current value and wake every subscriber.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Subscribe, starting from the current value.
    pub fn subscribe(&self) -> LatestReceiver<T> {
        self.tx.subscribe()
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T> fmt::Debug for Latest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latest")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
