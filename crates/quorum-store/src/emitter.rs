use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Handle returned by [`Emitter::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Synchronous multicast event emitter without replay.
///
/// Every listener registered at the moment of [`emit`](Emitter::emit) is
/// called once, in subscription order, before `emit` returns. Listeners added
/// afterwards never see past events.
///
/// The listener list is snapshotted before delivery, so a listener may
/// subscribe or unsubscribe from inside its callback. Such changes take effect
/// from the next emission.
pub struct Emitter<T> {
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Emitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener for all future events.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .expect("emitter lock poisoned")
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().expect("emitter lock poisoned");
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Deliver `event` to every current listener. Returns the number reached.
    pub fn emit(&self, event: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .read()
            .expect("emitter lock poisoned")
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().expect("emitter lock poisoned").len()
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
