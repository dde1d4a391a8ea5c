//! # Channel core: the subscription list.
//!
//! [`EventBase`] owns the ordered list of [`EventSubscription`]s of one
//! channel behind a single lock. Everything else in the bus is built on its
//! five operations: `subscribe`, `unsubscribe`, `contains`, `prune`, `publish`.
//!
//! ## Publish
//! ```text
//! publish(payload)
//!   ├─ lock
//!   │    for sub in list (insertion order):
//!   │       execution_strategy() ── None ─► removed (pruned)
//!   │                            └─ Some ─► collected
//!   ├─ unlock, drop pruned subscriptions
//!   └─ for strategy in collected: strategy(&payload)
//! ```
//!
//! ## Rules
//! - The lock is never held while a handler runs: handlers may subscribe,
//!   unsubscribe or publish on the same channel.
//! - A publish only sees the snapshot taken under the lock; subscriptions added
//!   by its own handlers start receiving on the next publish.
//! - Removed subscriptions are dropped after the lock is released.
//! - Disposing a token concurrently with a publish may still let that
//!   publish run the handler once (its strategy was already captured).

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace};

use super::event::Payload;
use crate::subscriptions::{EventSubscription, ExecutionStrategy, SubscriptionToken};

type Subscriptions<P> = Mutex<Vec<EventSubscription<P>>>;

/// Subscription list of one channel. Cheap to clone (shares the list).
pub struct EventBase<P> {
    subscriptions: Arc<Subscriptions<P>>,
}

impl<P: Payload> EventBase<P> {
    /// Creates an empty channel core.
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds `subscription` and returns its freshly assigned token.
    ///
    /// The token only holds a weak link back to this list.
    pub fn subscribe(&self, mut subscription: EventSubscription<P>) -> SubscriptionToken {
        let list = Arc::downgrade(&self.subscriptions);
        let token = SubscriptionToken::new(move |token| {
            if let Some(list) = list.upgrade() {
                let removed = remove_first(&list, |s| s.token() == Some(token));
                if removed.is_some() {
                    trace!(token = %token, "subscription disposed");
                }
            }
        });
        subscription.set_token(token.clone());
        let dispatch = subscription.delivery().dispatch();

        let count = {
            let mut subs = self.subscriptions.lock();
            subs.push(subscription);
            subs.len()
        };
        trace!(
            token = %token,
            dispatch = dispatch.as_label(),
            subscriptions = count,
            "subscribed"
        );
        token
    }

    /// Removes the subscription identified by `token`; no-op if absent.
    pub fn unsubscribe(&self, token: &SubscriptionToken) {
        let removed = remove_first(&self.subscriptions, |s| s.token() == Some(token));
        if removed.is_some() {
            trace!(token = %token, "unsubscribed");
        }
    }

    /// True if a subscription with `token` is registered.
    pub fn contains(&self, token: &SubscriptionToken) -> bool {
        self.any(|s| s.token() == Some(token))
    }

    /// Removes every subscription whose handler or filter is gone.
    pub fn prune(&self) {
        let dead = {
            let mut subs = self.subscriptions.lock();
            let (live, dead): (Vec<_>, Vec<_>) = std::mem::take(&mut *subs)
                .into_iter()
                .partition(EventSubscription::is_alive);
            *subs = live;
            dead
        };
        if !dead.is_empty() {
            debug!(pruned = dead.len(), "pruned dead subscriptions");
        }
    }

    /// Delivers `payload` to every live subscription, in subscription order.
    ///
    /// Direct handlers have run when this returns; background and marshaled
    /// ones are scheduled. Handler panics propagate to the caller.
    pub fn publish(&self, payload: P) {
        for strategy in self.prune_and_collect() {
            if let Err(err) = strategy(&payload) {
                error!(error = %err, label = err.as_label(), "delivery failed");
            }
        }
    }

    /// Number of registered subscriptions, including dead ones not yet pruned.
    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// True if no subscription is registered.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().is_empty()
    }

    /// True if both handles share the same subscription list.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.subscriptions, &other.subscriptions)
    }

    pub(crate) fn any<F>(&self, pred: F) -> bool
    where
        F: FnMut(&EventSubscription<P>) -> bool,
    {
        self.subscriptions.lock().iter().any(pred)
    }

    pub(crate) fn remove_first<F>(&self, pred: F) -> Option<EventSubscription<P>>
    where
        F: FnMut(&EventSubscription<P>) -> bool,
    {
        remove_first(&self.subscriptions, pred)
    }

    fn prune_and_collect(&self) -> Vec<ExecutionStrategy<P>> {
        let (strategies, dead, unresolved) = {
            let mut subs = self.subscriptions.lock();
            let capacity = subs.len();
            let all = std::mem::replace(&mut *subs, Vec::with_capacity(capacity));
            let mut strategies = Vec::with_capacity(all.len());
            let mut dead = Vec::new();
            let mut unresolved = Vec::new();
            for sub in all {
                match sub.resolve() {
                    Ok(strategy) => {
                        strategies.push(strategy);
                        subs.push(sub);
                    }
                    Err(partial) => {
                        unresolved.push(partial);
                        dead.push(sub);
                    }
                }
            }
            (strategies, dead, unresolved)
        };
        if !dead.is_empty() {
            debug!(pruned = dead.len(), "pruned dead subscriptions before publish");
        }
        drop(unresolved);
        strategies
    }
}

fn remove_first<P, F>(list: &Subscriptions<P>, pred: F) -> Option<EventSubscription<P>>
where
    F: FnMut(&EventSubscription<P>) -> bool,
{
    let mut subs = list.lock();
    let index = subs.iter().position(pred)?;
    Some(subs.remove(index))
}

impl<P> Clone for EventBase<P> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: Arc::clone(&self.subscriptions),
        }
    }
}

impl<P: Payload> Default for EventBase<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload> fmt::Debug for EventBase<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBase")
            .field("subscriptions", &self.len())
            .finish()
    }
}
