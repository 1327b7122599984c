//! Per-resource invalidation channel.
//!
//! Notifies interested readers that a key's state changed. Listeners are
//! global per resource; each emission carries the affected key and listeners
//! filter by key themselves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::request::Key;

/// Callback invoked with the affected key on every emission.
pub type Listener = Arc<dyn Fn(&str) + Send + Sync>;

/// Token returned by [`Emitter::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subscription(u64);

/// Invalidation emitter.
///
/// Emission snapshots the listener list before calling, so a listener that
/// unsubscribes (or subscribes) during emission does not corrupt iteration.
pub struct Emitter {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener; returns the token needed to unsubscribe it.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("emitter listener lock poisoned")
            .push((id, listener));
        Subscription(id)
    }

    /// Remove a previously registered listener. Unknown tokens are ignored.
    pub fn unsubscribe(&self, subscription: Subscription) {
        self.listeners
            .lock()
            .expect("emitter listener lock poisoned")
            .retain(|(id, _)| *id != subscription.0);
    }

    /// Notify every listener that the key's state changed.
    pub fn publish(&self, key: &Key) {
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .expect("emitter listener lock poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(key);
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_publish_reaches_listeners() {
        let emitter = Emitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        emitter.subscribe(Arc::new(move |key| {
            seen_clone.lock().unwrap().push(key.to_string());
        }));

        emitter.publish(&"k1".to_string());
        emitter.publish(&"k2".to_string());

        assert_eq!(*seen.lock().unwrap(), vec!["k1", "k2"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let emitter = Emitter::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        let subscription = emitter.subscribe(Arc::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        emitter.publish(&"k".to_string());
        emitter.unsubscribe(subscription);
        emitter.publish(&"k".to_string());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_during_emission() {
        let emitter = Arc::new(Emitter::new());
        let count = Arc::new(AtomicUsize::new(0));

        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let emitter_clone = Arc::clone(&emitter);
        let count_clone = Arc::clone(&count);
        let slot_clone = Arc::clone(&slot);
        let subscription = emitter.subscribe(Arc::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(subscription) = slot_clone.lock().unwrap().take() {
                emitter_clone.unsubscribe(subscription);
            }
        }));
        *slot.lock().unwrap() = Some(subscription);

        // First emission removes the listener from inside the callback.
        emitter.publish(&"k".to_string());
        emitter.publish(&"k".to_string());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
