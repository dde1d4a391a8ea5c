//! # Event subscriptions.
//!
//! An [`EventSubscription`] ties together a handler reference, a filter
//! reference and a [`Delivery`]. At publish time the channel asks it for an
//! [`ExecutionStrategy`]: a ready-to-call closure, or `None` when either
//! reference is dead (the subscription is then pruned).
//!
//! ## Flow
//! ```text
//! execution_strategy()
//!   ├─ action.target()  ── None ─► None (dead)
//!   ├─ filter.target()  ── None ─► None (dead)
//!   └─ Some(|payload| if filter(payload) { delivery.deliver(action, payload) })
//! ```
//!
//! The filter always runs on the publisher thread; only the action is subject
//! to the delivery variant.

use std::fmt;
use std::sync::Arc;

use crate::delegates::{Action, DelegateReference, Predicate};
use crate::dispatch::{Background, Delivery, DispatchContext};
use crate::error::EventError;
use crate::events::Payload;

use super::token::SubscriptionToken;

/// Resolved invocation for one live subscription, valid for one publish.
pub type ExecutionStrategy<P> = Box<dyn FnOnce(&P) -> Result<(), EventError>>;

/// Strong halves resolved for a dead subscription.
pub(crate) type Unresolved<P> = (Option<Action<P>>, Option<Predicate<P>>);

/// One registered handler on a channel.
pub struct EventSubscription<P> {
    action: DelegateReference<P>,
    filter: DelegateReference<P, bool>,
    delivery: Delivery,
    token: Option<SubscriptionToken>,
}

impl<P: Payload> EventSubscription<P> {
    /// Builds a subscription.
    ///
    /// Fails with [`EventError::InvalidReference`] if either reference no
    /// longer resolves to a live target.
    pub fn new(
        action: DelegateReference<P>,
        filter: DelegateReference<P, bool>,
        delivery: Delivery,
    ) -> Result<Self, EventError> {
        if !action.is_alive() {
            return Err(EventError::InvalidReference { role: "action" });
        }
        if !filter.is_alive() {
            return Err(EventError::InvalidReference { role: "filter" });
        }

        Ok(Self {
            action,
            filter,
            delivery,
            token: None,
        })
    }

    /// Subscription invoked on the publisher thread.
    pub fn direct(
        action: DelegateReference<P>,
        filter: DelegateReference<P, bool>,
    ) -> Result<Self, EventError> {
        Self::new(action, filter, Delivery::Direct)
    }

    /// Subscription invoked on a worker pool.
    pub fn background(
        action: DelegateReference<P>,
        filter: DelegateReference<P, bool>,
        pool: Background,
    ) -> Result<Self, EventError> {
        Self::new(action, filter, Delivery::Background(pool))
    }

    /// Subscription invoked on `context`.
    pub fn marshaled(
        action: DelegateReference<P>,
        filter: DelegateReference<P, bool>,
        context: Arc<dyn DispatchContext>,
    ) -> Result<Self, EventError> {
        Self::new(action, filter, Delivery::Marshaled(context))
    }

    /// Resolves the handler, if still alive.
    pub fn action(&self) -> Option<Action<P>> {
        self.action.target()
    }

    /// Resolves the filter, if still alive.
    pub fn filter(&self) -> Option<Predicate<P>> {
        self.filter.target()
    }

    /// True while both handler and filter resolve.
    pub fn is_alive(&self) -> bool {
        self.action.is_alive() && self.filter.is_alive()
    }

    pub(crate) fn action_reference(&self) -> &DelegateReference<P> {
        &self.action
    }

    /// Token assigned when the subscription was added to a channel.
    pub fn token(&self) -> Option<&SubscriptionToken> {
        self.token.as_ref()
    }

    pub(crate) fn set_token(&mut self, token: SubscriptionToken) {
        self.token = Some(token);
    }

    /// Delivery variant fixed at construction.
    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Returns the invocation for this publish, or `None` if the subscription is dead.
    pub fn execution_strategy(&self) -> Option<ExecutionStrategy<P>> {
        self.resolve().ok()
    }

    /// Like [`Self::execution_strategy`], but a dead subscription hands back
    /// whatever half of it did resolve, so the caller controls where it drops.
    pub(crate) fn resolve(&self) -> Result<ExecutionStrategy<P>, Unresolved<P>> {
        let (action, filter) = match (self.action.target(), self.filter.target()) {
            (Some(action), Some(filter)) => (action, filter),
            partial => return Err(partial),
        };
        let delivery = self.delivery.clone();

        Ok(Box::new(move |argument: &P| {
            if filter.call(argument) {
                delivery.deliver(Some(action), argument)
            } else {
                Ok(())
            }
        }))
    }

    /// Invokes `action` with this subscription's delivery variant.
    pub fn invoke_action(&self, action: Option<Action<P>>, argument: &P) -> Result<(), EventError> {
        self.delivery.deliver(action, argument)
    }
}

impl<P: Payload> fmt::Debug for EventSubscription<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("action", &self.action)
            .field("filter", &self.filter)
            .field("delivery", &self.delivery)
            .field("token", &self.token)
            .finish()
    }
}
