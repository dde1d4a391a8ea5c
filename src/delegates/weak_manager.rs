//! # Weak listener list.
//!
//! [`WeakDelegatesManager`] is the minimal form of the bus: a flat list of
//! weakly held listeners with no tokens, filters or dispatch variants.
//! Dead listeners are dropped lazily on every `raise` and `remove_listener`.

use parking_lot::Mutex;

use super::delegate::Action;
use super::reference::DelegateReference;

/// Thread-safe list of weakly held listeners.
pub struct WeakDelegatesManager<P> {
    listeners: Mutex<Vec<DelegateReference<P>>>,
}

impl<P: 'static> WeakDelegatesManager<P> {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Adds a weakly held listener.
    pub fn add_listener(&self, listener: &Action<P>) {
        self.listeners
            .lock()
            .push(DelegateReference::new(listener, false));
    }

    /// Removes every reference to `listener`, and every dead listener.
    pub fn remove_listener(&self, listener: &Action<P>) {
        self.listeners.lock().retain(|reference| {
            !(reference.target_equals(None) || reference.target_equals(Some(listener)))
        });
    }

    /// Calls every live listener with `argument`.
    ///
    /// Listeners run outside the lock, so they may add or remove listeners.
    pub fn raise(&self, argument: &P) {
        let handlers: Vec<Action<P>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|reference| !reference.target_equals(None));
            listeners.iter().filter_map(DelegateReference::target).collect()
        };

        for handler in handlers {
            handler.call(argument);
        }
    }

    /// Number of stored listeners, including dead ones not yet pruned.
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// True if no listener is stored.
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

impl<P: 'static> Default for WeakDelegatesManager<P> {
    fn default() -> Self {
        Self::new()
    }
}
