//! Auth change listener registry.
//!
//! Identity providers keep one [`ListenerRegistry`] and call
//! [`notify`](ListenerRegistry::notify) after every session transition.
//! Listeners run synchronously on the notifying task, in registration order,
//! and providers call them while still holding their own session lock.
//! A listener must therefore never call back into the provider; anything that
//! needs the provider has to be deferred to another task.

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::trace;

use super::types::AuthChange;

/// Callback invoked on every session transition.
pub type AuthListener = Arc<dyn Fn(&AuthChange) + Send + Sync>;

type Listeners = Mutex<BTreeMap<u64, AuthListener>>;

/// Ordered set of registered auth listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Arc<Listeners>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is unsubscribed or dropped.
    pub fn subscribe(&self, listener: AuthListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().unwrap().insert(id, listener);
        trace!(id, "auth listener registered");
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver a change to every listener, in registration order.
    ///
    /// The registry lock is released before the callbacks run, so a listener
    /// may unsubscribe itself.
    pub fn notify(&self, change: &AuthChange) {
        let listeners: Vec<AuthListener> =
            self.listeners.lock().unwrap().values().cloned().collect();
        trace!(event = %change.event, count = listeners.len(), "notifying auth listeners");
        for listener in listeners {
            listener(change);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Handle keeping an auth listener registered.
///
/// Dropping the handle unsubscribes. It holds only a weak reference to the
/// registry, so it never keeps a provider alive.
#[must_use = "dropping a Subscription unsubscribes the listener"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    /// Stop receiving notifications.
    pub fn unsubscribe(self) {
        drop(self);
    }

    fn release(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().unwrap().remove(&self.id);
            trace!(id = self.id, "auth listener released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
