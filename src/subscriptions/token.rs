//! # Subscription tokens.
//!
//! A [`SubscriptionToken`] identifies one subscription. Clones share the same
//! identity and the same unsubscribe callback, so disposing any clone cancels
//! the subscription, exactly once.
//!
//! ## Rules
//! - Equality and hashing use the random 128-bit id only.
//! - The callback is taken out before it runs; later `dispose` calls are no-ops.
//! - The callback runs outside the token lock.
//! - [`SubscriptionGuard`] disposes on drop for scope-bound subscriptions.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

type Unsubscribe = Box<dyn FnOnce(&SubscriptionToken) + Send>;

/// Handle returned by subscribe; dispose it to unsubscribe.
#[derive(Clone)]
pub struct SubscriptionToken {
    inner: Arc<TokenInner>,
}

struct TokenInner {
    id: u128,
    unsubscribe: Mutex<Option<Unsubscribe>>,
}

impl SubscriptionToken {
    /// Creates a token that calls `unsubscribe` on its first disposal.
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce(&SubscriptionToken) + Send + 'static,
    {
        let unsubscribe: Unsubscribe = Box::new(unsubscribe);
        Self {
            inner: Arc::new(TokenInner {
                id: rand::random(),
                unsubscribe: Mutex::new(Some(unsubscribe)),
            }),
        }
    }

    /// Unique id of this subscription.
    pub fn id(&self) -> u128 {
        self.inner.id
    }

    /// Cancels the subscription. Idempotent.
    pub fn dispose(&self) {
        let unsubscribe = self.inner.unsubscribe.lock().take();
        if let Some(unsubscribe) = unsubscribe {
            unsubscribe(self);
        }
    }

    /// True once [`Self::dispose`] has run on any clone.
    pub fn is_disposed(&self) -> bool {
        self.inner.unsubscribe.lock().is_none()
    }

    /// Wraps the token in a guard that disposes it when dropped.
    #[must_use = "dropping the guard immediately unsubscribes"]
    pub fn drop_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { token: Some(self) }
    }
}

impl PartialEq for SubscriptionToken {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SubscriptionToken {}

impl Hash for SubscriptionToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionToken")
            .field("id", &format_args!("{:032x}", self.inner.id))
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.inner.id)
    }
}

/// Disposes its token on drop.
#[derive(Debug)]
pub struct SubscriptionGuard {
    token: Option<SubscriptionToken>,
}

impl SubscriptionGuard {
    /// Borrows the guarded token.
    pub fn token(&self) -> Option<&SubscriptionToken> {
        self.token.as_ref()
    }

    /// Returns the token without disposing it.
    pub fn disarm(mut self) -> Option<SubscriptionToken> {
        self.token.take()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.dispose();
        }
    }
}
