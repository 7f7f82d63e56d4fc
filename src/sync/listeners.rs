//! Observer registration for queue events.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

/// Handle returned by a subscription; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of callbacks for one kind of event.
///
/// Callbacks run on the thread that raised the event, after the list lock
/// is released, so a callback may subscribe or unsubscribe.
pub(super) struct Listeners<T> {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(ListenerId, Callback<T>)>>,
}

impl<T> Listeners<T> {
    pub(super) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn add(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let callback: Callback<T> = Arc::new(callback);
        self.lock().push((id, callback));
        id
    }

    /// Returns `true` if the listener was registered here.
    pub(super) fn remove(&self, id: ListenerId) -> bool {
        let mut callbacks = self.lock();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub(super) fn emit(&self, event: &T) {
        let snapshot: Vec<Callback<T>> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in snapshot {
            callback(event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, Callback<T>)>> {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    #[test]
    fn emit_reaches_every_listener_until_removed() {
        let listeners = Listeners::<usize>::new();
        let total = Arc::new(AtomicUsize::new(0));

        let t = total.clone();
        let first = listeners.add(move |n| {
            t.fetch_add(*n, Ordering::SeqCst);
        });
        let t = total.clone();
        listeners.add(move |n| {
            t.fetch_add(*n, Ordering::SeqCst);
        });

        listeners.emit(&2);
        assert_eq!(total.load(Ordering::SeqCst), 4);

        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        listeners.emit(&2);
        assert_eq!(total.load(Ordering::SeqCst), 6);
    }
}
