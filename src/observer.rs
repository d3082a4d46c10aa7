//! Per-id change notification for the metadata stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type Callback = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle returned by `register`, used to deregister exactly one callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

#[derive(Default)]
pub struct Observer {
    next_token: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<(SubscriptionToken, Callback)>>>,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Vec<(SubscriptionToken, Callback)>>> {
        // A panicking callback never runs under this lock, so the map is intact
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a callback for `id`. Several callbacks may watch the same id.
    pub fn register<F>(&self, id: &str, callback: F) -> SubscriptionToken
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.listeners()
            .entry(id.to_string())
            .or_default()
            .push((token, Arc::new(callback)));
        token
    }

    /// Remove one callback. Returns false if the token was already gone.
    pub fn unregister(&self, token: SubscriptionToken) -> bool {
        let mut listeners = self.listeners();
        let mut removed = false;
        listeners.retain(|_, callbacks| {
            let before = callbacks.len();
            callbacks.retain(|(t, _)| *t != token);
            removed |= callbacks.len() != before;
            !callbacks.is_empty()
        });
        removed
    }

    /// Invoke every callback registered for `id`.
    ///
    /// Callbacks run after the registry lock is released, so they may
    /// register, unregister or read the store that emitted.
    pub fn emit(&self, id: &str) {
        let callbacks: Vec<Callback> = match self.listeners().get(id) {
            Some(callbacks) => callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return,
        };
        for callback in callbacks {
            callback(id);
        }
    }

    pub fn listener_count(&self, id: &str) -> usize {
        self.listeners().get(id).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&str) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        (count, move |_: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_is_scoped_to_id() {
        let observer = Observer::new();
        let (trip, on_trip) = counter();
        let (home, on_home) = counter();
        observer.register("trip2024", on_trip);
        observer.register("home", on_home);

        observer.emit("trip2024");
        observer.emit("trip2024");

        assert_eq!(trip.load(Ordering::SeqCst), 2);
        assert_eq!(home.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister_one_keeps_others() {
        let observer = Observer::new();
        let (first, on_first) = counter();
        let (second, on_second) = counter();
        let token = observer.register("trip2024", on_first);
        observer.register("trip2024", on_second);

        assert!(observer.unregister(token));
        assert!(!observer.unregister(token));
        observer.emit("trip2024");

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(observer.listener_count("trip2024"), 1);
    }

    #[test]
    fn test_callback_can_reenter_observer() {
        let observer = Arc::new(Observer::new());
        let inner = Arc::clone(&observer);
        observer.register("trip2024", move |id| {
            inner.register(id, |_| {});
        });

        observer.emit("trip2024");

        assert_eq!(observer.listener_count("trip2024"), 2);
    }
}
