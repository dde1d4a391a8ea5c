//! # Typed channel.
//!
//! [`PubSubEvent`] is the handle application code works with: a thin,
//! cloneable wrapper over [`EventBase`] that turns delegates into
//! subscriptions and carries the dispatch environment inherited from its
//! registry (home context for marshaled delivery, runtime for background).
//!
//! ## Subscribe variants
//! ```text
//! subscribe(&a)                    Direct, weak, no filter
//! subscribe_on(&a, dispatch)       chosen dispatch, weak, no filter
//! subscribe_keep_alive(&a, keep)   Direct, chosen lifetime, no filter
//! subscribe_filtered(&a, &f)       Direct, weak, filter held weakly too
//! subscribe_with(&a, options)      everything explicit
//! ```
//!
//! Without a filter the subscription gets an always-true static predicate held
//! strongly, so the filter is never the reason a subscription is pruned.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use weakbus::{Action, Delegate, PubSubEvent};
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let h = Arc::clone(&hits);
//! let handler: Action<String> = Delegate::new(move |msg: &String| {
//!     assert_eq!(msg, "hello");
//!     h.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! let channel = PubSubEvent::new();
//! let token = channel.subscribe(&handler).unwrap();
//! channel.publish("hello".to_string());
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//!
//! token.dispose();
//! channel.publish("hello".to_string());
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::base::EventBase;
use super::event::Payload;
use crate::core::Config;
use crate::delegates::{Action, Delegate, DelegateReference, Predicate};
use crate::dispatch::{Background, Delivery, Dispatch, DispatchContext};
use crate::error::EventError;
use crate::subscriptions::{EventSubscription, SubscriptionToken};

/// Explicit subscription settings for [`PubSubEvent::subscribe_with`].
///
/// Default: `Dispatch::Direct`, weak (`keep_alive = false`), no filter.
pub struct SubscribeOptions<P> {
    dispatch: Dispatch,
    keep_alive: bool,
    filter: Option<Predicate<P>>,
}

impl<P> SubscribeOptions<P> {
    /// Sets where the handler runs.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Holds handler and filter strongly when `true`.
    ///
    /// Strong subscriptions must be disposed explicitly.
    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Only payloads for which `filter` returns `true` reach the handler.
    pub fn with_filter(mut self, filter: &Predicate<P>) -> Self {
        self.filter = Some(filter.clone());
        self
    }
}

impl<P> Default for SubscribeOptions<P> {
    fn default() -> Self {
        Self {
            dispatch: Dispatch::Direct,
            keep_alive: false,
            filter: None,
        }
    }
}

/// Payload-typed broadcast channel.
///
/// ### Properties
/// - **Cloneable**: clones share the subscription list.
/// - **Thread-safe**: subscribe/unsubscribe/publish from any thread.
/// - **Weak by default**: subscribers are not kept alive by the channel.
pub struct PubSubEvent<P> {
    base: EventBase<P>,
    home: Option<Arc<dyn DispatchContext>>,
    runtime: Option<Handle>,
}

fn accept_all<P>(_: &P) -> bool {
    true
}

impl<P: Payload> PubSubEvent<P> {
    /// Creates a standalone channel without a home context.
    ///
    /// Marshaled subscriptions on it fail with [`EventError::NoDispatchContext`].
    pub fn new() -> Self {
        Self {
            base: EventBase::new(),
            home: None,
            runtime: None,
        }
    }

    /// Creates a standalone channel whose marshaled handlers run on `context`.
    pub fn with_home_context(context: Arc<dyn DispatchContext>) -> Self {
        Self {
            home: Some(context),
            ..Self::new()
        }
    }

    pub(crate) fn from_config(cfg: &Config) -> Self {
        Self {
            base: EventBase::new(),
            home: cfg.home_context.clone(),
            runtime: cfg.runtime.clone(),
        }
    }

    /// Underlying subscription list.
    pub fn base(&self) -> &EventBase<P> {
        &self.base
    }

    /// Context marshaled handlers run on, if any.
    pub fn home_context(&self) -> Option<&Arc<dyn DispatchContext>> {
        self.home.as_ref()
    }

    /// Subscribes `action` with direct dispatch, held weakly.
    pub fn subscribe(&self, action: &Action<P>) -> Result<SubscriptionToken, EventError> {
        self.subscribe_with(action, SubscribeOptions::default())
    }

    /// Subscribes `action` with the given dispatch, held weakly.
    pub fn subscribe_on(
        &self,
        action: &Action<P>,
        dispatch: Dispatch,
    ) -> Result<SubscriptionToken, EventError> {
        self.subscribe_with(action, SubscribeOptions::default().with_dispatch(dispatch))
    }

    /// Subscribes `action` with direct dispatch and the given lifetime policy.
    pub fn subscribe_keep_alive(
        &self,
        action: &Action<P>,
        keep_alive: bool,
    ) -> Result<SubscriptionToken, EventError> {
        self.subscribe_with(action, SubscribeOptions::default().with_keep_alive(keep_alive))
    }

    /// Subscribes `action` behind `filter`, direct dispatch, both held weakly.
    pub fn subscribe_filtered(
        &self,
        action: &Action<P>,
        filter: &Predicate<P>,
    ) -> Result<SubscriptionToken, EventError> {
        self.subscribe_with(action, SubscribeOptions::default().with_filter(filter))
    }

    /// Subscribes `action` with explicit options.
    ///
    /// Fails with [`EventError::NoDispatchContext`] for marshaled dispatch on a
    /// channel without a home context.
    pub fn subscribe_with(
        &self,
        action: &Action<P>,
        options: SubscribeOptions<P>,
    ) -> Result<SubscriptionToken, EventError> {
        let delivery = match options.dispatch {
            Dispatch::Direct => Delivery::Direct,
            Dispatch::Background => Delivery::Background(self.background()),
            Dispatch::Marshaled => {
                let home = self.home.clone().ok_or(EventError::NoDispatchContext)?;
                Delivery::Marshaled(home)
            }
        };

        let action = DelegateReference::new(action, options.keep_alive);
        let filter = match &options.filter {
            Some(filter) => DelegateReference::new(filter, options.keep_alive),
            None => DelegateReference::new(&Delegate::from_fn(accept_all::<P>), true),
        };

        let subscription = EventSubscription::new(action, filter, delivery)?;
        Ok(self.base.subscribe(subscription))
    }

    /// Removes the subscription identified by `token`; no-op if absent.
    pub fn unsubscribe(&self, token: &SubscriptionToken) {
        self.base.unsubscribe(token);
    }

    /// Removes the first subscription whose handler is `action`; no-op if none.
    pub fn unsubscribe_handler(&self, action: &Action<P>) {
        drop(
            self.base
                .remove_first(|s| s.action_reference().target_equals(Some(action))),
        );
    }

    /// True if a subscription with `token` is registered.
    pub fn contains(&self, token: &SubscriptionToken) -> bool {
        self.base.contains(token)
    }

    /// True if some subscription's handler is `action`.
    pub fn contains_handler(&self, action: &Action<P>) -> bool {
        self.base
            .any(|s| s.action_reference().target_equals(Some(action)))
    }

    /// Delivers `payload` to every live subscriber.
    pub fn publish(&self, payload: P) {
        self.base.publish(payload);
    }

    /// Drops subscriptions whose handler or filter is gone.
    pub fn prune(&self) {
        self.base.prune();
    }

    /// Number of registered subscriptions, including dead ones not yet pruned.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// True if no subscription is registered.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// True if both handles refer to the same channel.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.base.ptr_eq(&other.base)
    }

    fn background(&self) -> Background {
        match &self.runtime {
            Some(handle) => Background::Runtime(handle.clone()),
            None => Background::Ambient,
        }
    }
}

impl PubSubEvent<()> {
    /// Publishes on a channel that carries no payload.
    pub fn signal(&self) {
        self.publish(());
    }
}

impl<P> Clone for PubSubEvent<P> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            home: self.home.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<P: Payload> Default for PubSubEvent<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Payload> fmt::Debug for PubSubEvent<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubEvent")
            .field("subscriptions", &self.len())
            .field("home", &self.home.as_ref().map(|ctx| ctx.name()))
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::HomeContext;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counter<P: Payload>() -> (Action<P>, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let action = Delegate::new(move |_: &P| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (action, hits)
    }

    #[derive(Default)]
    struct Listener {
        seen: Mutex<Vec<String>>,
    }

    impl Listener {
        fn on_message(&self, msg: &String) {
            self.seen.lock().push(msg.clone());
        }
    }

    #[test]
    fn direct_handler_runs_before_publish_returns() {
        let channel = PubSubEvent::new();
        let listener = Arc::new(Listener::default());
        let action: Action<String> = Delegate::method(&listener, Listener::on_message);
        channel.subscribe(&action).expect("subscribed");

        channel.publish("hello".to_string());
        assert_eq!(*listener.seen.lock(), vec!["hello".to_string()]);
    }

    #[test]
    fn weak_subscriber_stops_receiving_once_dropped() {
        let channel = PubSubEvent::<String>::new();
        let (action, hits) = counter();
        channel.subscribe(&action).expect("subscribed");
        drop(action);

        channel.publish("x".into());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(channel.is_empty());
    }

    #[test]
    fn bound_method_lives_as_long_as_its_receiver() {
        let channel = PubSubEvent::new();
        let listener = Arc::new(Listener::default());
        let observer = Arc::downgrade(&listener);
        let action: Action<String> = Delegate::method(&listener, Listener::on_message);
        channel.subscribe(&action).expect("subscribed");
        drop(action);

        channel.publish("first".to_string());
        assert_eq!(listener.seen.lock().len(), 1);

        drop(listener);
        channel.publish("second".to_string());
        assert!(observer.upgrade().is_none());
        assert!(channel.is_empty());
    }

    #[test]
    fn keep_alive_subscriber_survives_dropping_the_original() {
        let channel = PubSubEvent::<String>::new();
        let (action, hits) = counter();
        channel.subscribe_keep_alive(&action, true).expect("subscribed");
        drop(action);

        channel.publish("x".into());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn handler_subscribed_during_publish_waits_for_next_publish() {
        let channel = PubSubEvent::<u32>::new();
        let (late, late_hits) = counter();
        let late = Arc::new(late);

        let ch = channel.clone();
        let l = Arc::clone(&late);
        let subscribed = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&subscribed);
        let first: Action<u32> = Delegate::new(move |_: &u32| {
            if s.fetch_add(1, Ordering::SeqCst) == 0 {
                ch.subscribe(&l).expect("subscribe from handler");
            }
        });
        channel.subscribe(&first).expect("subscribed");

        channel.publish(1);
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        channel.publish(2);
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_may_unsubscribe_itself_while_running() {
        let channel = PubSubEvent::<u32>::new();
        let token_slot: Arc<Mutex<Option<SubscriptionToken>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicUsize::new(0));

        let slot = Arc::clone(&token_slot);
        let h = Arc::clone(&hits);
        let once: Action<u32> = Delegate::new(move |_: &u32| {
            h.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = slot.lock().take() {
                token.dispose();
            }
        });
        let token = channel.subscribe(&once).expect("subscribed");
        *token_slot.lock() = Some(token.clone());

        channel.publish(1);
        channel.publish(2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!channel.contains(&token));
    }

    #[test]
    fn filter_gates_delivery() {
        let channel = PubSubEvent::<u32>::new();
        let (action, hits) = counter();
        let even: Predicate<u32> = Delegate::new(|v: &u32| v % 2 == 0);
        channel.subscribe_filtered(&action, &even).expect("subscribed");

        channel.publish(1);
        channel.publish(3);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        channel.publish(2);
        channel.publish(4);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn weak_filter_dying_prunes_the_subscription() {
        let channel = PubSubEvent::<u32>::new();
        let (action, hits) = counter();
        let filter: Predicate<u32> = Delegate::new(|_: &u32| true);
        channel.subscribe_filtered(&action, &filter).expect("subscribed");
        drop(filter);

        channel.publish(1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(channel.is_empty());
    }

    #[test]
    fn default_filter_never_dies_with_weak_action() {
        let channel = PubSubEvent::<u32>::new();
        let (action, hits) = counter();
        channel.subscribe(&action).expect("subscribed");

        channel.prune();
        channel.publish(1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn disposing_twice_is_harmless() {
        let channel = PubSubEvent::<u32>::new();
        let (action, hits) = counter();
        let (other, other_hits) = counter();
        let token = channel.subscribe(&action).expect("subscribed");
        channel.subscribe(&other).expect("subscribed");

        token.dispose();
        assert!(!channel.contains(&token));
        token.dispose();

        channel.publish(1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(other_hits.load(Ordering::SeqCst), 1);
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn unsubscribe_handler_removes_exactly_one() {
        let channel = PubSubEvent::<u32>::new();
        let (action, hits) = counter();
        channel.subscribe(&action).expect("subscribed");
        channel.subscribe(&action).expect("subscribed");

        channel.publish(1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        channel.unsubscribe_handler(&action);
        assert!(channel.contains_handler(&action));
        channel.publish(1);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unsubscribe_handler_ignores_unknown_handlers() {
        let channel = PubSubEvent::<u32>::new();
        let (action, _) = counter();
        let (stranger, _) = counter();
        channel.subscribe(&action).expect("subscribed");

        channel.unsubscribe_handler(&stranger);
        assert!(!channel.contains_handler(&stranger));
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn no_payload_channel_counts_every_subscription() {
        let channel = PubSubEvent::<()>::new();
        let (action, hits) = counter();
        let first = channel.subscribe(&action).expect("subscribed");
        channel.subscribe(&action).expect("subscribed");

        channel.signal();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        channel.unsubscribe(&first);
        channel.signal();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn marshaled_requires_a_home_context() {
        let channel = PubSubEvent::<u32>::new();
        let (action, _) = counter();
        let err = channel
            .subscribe_on(&action, Dispatch::Marshaled)
            .expect_err("no home context");
        assert_eq!(err, EventError::NoDispatchContext);
        assert!(channel.is_empty());
    }

    #[test]
    fn marshaled_handlers_run_on_the_home_loop_in_order() {
        let (ctx, mut home) = HomeContext::new("ui");
        let channel = PubSubEvent::with_home_context(Arc::new(ctx));
        let listener = Arc::new(Listener::default());
        let action: Action<String> = Delegate::method(&listener, Listener::on_message);
        channel
            .subscribe_on(&action, Dispatch::Marshaled)
            .expect("subscribed");

        channel.publish("a".to_string());
        channel.publish("b".to_string());
        assert!(listener.seen.lock().is_empty());

        assert_eq!(home.run_pending(), 2);
        assert_eq!(*listener.seen.lock(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn background_handler_runs_once_off_thread() {
        let channel = PubSubEvent::<()>::new();
        let (tx, rx) = std::sync::mpsc::channel();
        let tx = Mutex::new(tx);
        let publisher = std::thread::current().id();
        let action: Action<()> = Delegate::new(move |_: &()| {
            let _ = tx.lock().send(std::thread::current().id());
        });
        channel
            .subscribe_on(&action, Dispatch::Background)
            .expect("subscribed");

        channel.signal();
        let worker = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("background handler ran");
        assert_ne!(worker, publisher);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn background_handler_uses_the_runtime() {
        let channel = PubSubEvent::<u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let notify = Arc::new(tokio::sync::Notify::new());
        let (h, n) = (Arc::clone(&hits), Arc::clone(&notify));
        let action: Action<u32> = Delegate::new(move |v: &u32| {
            h.fetch_add(*v as usize, Ordering::SeqCst);
            n.notify_one();
        });
        channel
            .subscribe_with(
                &action,
                SubscribeOptions::default()
                    .with_dispatch(Dispatch::Background)
                    .with_keep_alive(true),
            )
            .expect("subscribed");

        channel.publish(5);
        tokio::time::timeout(Duration::from_secs(5), notify.notified())
            .await
            .expect("background handler ran");
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn background_subscription_outlives_the_runtime_it_was_made_in() {
        let channel = PubSubEvent::<u32>::new();
        let (tx, rx) = std::sync::mpsc::channel();
        let tx = Mutex::new(tx);
        let action: Action<u32> = Delegate::new(move |v: &u32| {
            let _ = tx.lock().send(*v);
        });

        let rt = tokio::runtime::Runtime::new().expect("runtime");
        rt.block_on(async {
            channel
                .subscribe_on(&action, Dispatch::Background)
                .expect("subscribed");
        });
        drop(rt);

        channel.publish(7);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).ok(), Some(7));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn handler_may_publish_on_its_own_channel() {
        let channel = PubSubEvent::<u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let ch = channel.clone();
        let h = Arc::clone(&hits);
        let countdown: Action<u32> = Delegate::new(move |v: &u32| {
            h.fetch_add(1, Ordering::SeqCst);
            if *v > 0 {
                ch.publish(v - 1);
            }
        });
        channel.subscribe(&countdown).expect("subscribed");

        channel.publish(3);
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn concurrent_subscribe_dispose_and_publish() {
        const WORKERS: usize = 4;
        const ROUNDS: usize = 100;
        const PUBLISHERS: usize = 2;
        const PUBLISHES: usize = 500;

        let channel = PubSubEvent::<u32>::new();
        let (stable, stable_hits) = counter::<u32>();
        let stable_token = channel.subscribe(&stable).expect("subscribed");

        std::thread::scope(|scope| {
            for _ in 0..WORKERS {
                scope.spawn(|| {
                    for _ in 0..ROUNDS {
                        let (own, own_hits) = counter::<u32>();
                        let token = channel.subscribe(&own).expect("subscribed");
                        channel.publish(1);
                        assert!(own_hits.load(Ordering::SeqCst) >= 1);
                        token.dispose();
                        assert!(!channel.contains(&token));
                    }
                });
            }
            for _ in 0..PUBLISHERS {
                scope.spawn(|| {
                    for _ in 0..PUBLISHES {
                        channel.publish(0);
                    }
                });
            }
        });

        assert_eq!(
            stable_hits.load(Ordering::SeqCst),
            WORKERS * ROUNDS + PUBLISHERS * PUBLISHES
        );
        assert_eq!(channel.len(), 1);
        assert!(channel.contains(&stable_token));
    }

    #[test]
    #[should_panic(expected = "handler failed")]
    fn direct_handler_panic_reaches_the_publisher() {
        let channel = PubSubEvent::<u32>::new();
        let action: Action<u32> = Delegate::new(|_: &u32| panic!("handler failed"));
        channel.subscribe(&action).expect("subscribed");
        channel.publish(1);
    }
}
