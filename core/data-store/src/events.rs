//! FILENAME: core/data-store/src/events.rs
// PURPOSE: Filter-change notifications.
// CONTEXT: The observer list belongs to one store instance. Subscribing hands
//          back a `Subscription` whose `unsubscribe` removes the callback.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use engine::FilterState;

/// Payload delivered to subscribers after every filter update.
#[derive(Debug, Clone)]
pub struct FilterChange {
    /// The new state, the same snapshot `DataStore::filters` now returns.
    pub filters: Arc<FilterState>,
    /// Generation of the update that produced this state.
    pub generation: u64,
}

type Callback = Arc<dyn Fn(&FilterChange) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct Listeners {
    registry: Arc<Mutex<Registry>>,
}

impl Listeners {
    pub fn new() -> Self {
        Listeners::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&FilterChange) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.callbacks.push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Calls every subscriber in subscription order.
    ///
    /// The list is copied first, so a callback may subscribe or unsubscribe
    /// without deadlocking; such changes apply from the next notification.
    pub fn notify(&self, change: &FilterChange) {
        let callbacks: Vec<Callback> = lock(&self.registry)
            .callbacks
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback(change);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.registry).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by `DataStore::on_filters_changed`.
///
/// Dropping it keeps the callback registered; call `unsubscribe` to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Removes the callback. Returns false if it was already gone
    /// (or the store has been dropped).
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = lock(&registry);
        let before = registry.callbacks.len();
        registry.callbacks.retain(|(id, _)| *id != self.id);
        registry.callbacks.len() != before
    }

    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map_or(false, |registry| lock(&registry).callbacks.iter().any(|(id, _)| *id == self.id))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("next_id", &self.next_id)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn change() -> FilterChange {
        FilterChange {
            filters: Arc::new(FilterState::new().with("store", "A")),
            generation: 1,
        }
    }

    #[test]
    fn notifies_in_subscription_order() {
        let listeners = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            listeners.subscribe(move |c: &FilterChange| {
                seen.lock().unwrap().push((tag, c.generation));
            });
        }
        listeners.notify(&change());

        assert_eq!(*seen.lock().unwrap(), vec![("first", 1), ("second", 1)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let listeners = Listeners::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscription = listeners.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        listeners.notify(&change());
        assert!(subscription.is_active());
        assert!(subscription.unsubscribe());
        listeners.notify(&change());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn unsubscribe_after_listeners_dropped() {
        let listeners = Listeners::new();
        let subscription = listeners.subscribe(|_| {});
        drop(listeners);
        assert!(!subscription.is_active());
        assert!(!subscription.unsubscribe());
    }
}
