//! # weakbus
//!
//! **Weakbus** is an in-process, type-keyed publish/subscribe event bus.
//!
//! Components exchange events without knowing about each other: a publisher
//! looks up the channel for an event kind and publishes a payload, subscribers
//! registered on that channel get called. By default the bus holds subscribers
//! **weakly**, so subscribing never keeps a component alive; once the last
//! strong handle is dropped its subscriptions are pruned on the next publish.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌───────────────┐          ┌───────────────┐
//!  │   publisher   │          │  subscriber   │ (owns its Action/Predicate)
//!  └──────┬────────┘          └──────┬────────┘
//!         │ get::<K>()               │ get::<K>().subscribe(&action)
//!         ▼                          ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  EventRegistry  (TypeId of K → PubSubEvent<K::Payload>)   │
//! │  - Config { home_context, runtime } inherited by channels │
//! └──────────────────────────┬────────────────────────────────┘
//!                            ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  PubSubEvent / EventBase  (ordered subscription list)     │
//! │  EventSubscription = action ref + filter ref + Delivery   │
//! │                      + SubscriptionToken                  │
//! └──────────────────────────┬────────────────────────────────┘
//!                            │ publish(payload)
//!                            ▼
//!          ┌─────────────────┼─────────────────┐
//!          ▼                 ▼                 ▼
//!       Direct          Background         Marshaled
//!   (publisher thread) (tokio blocking   (HomeContext queue,
//!                       pool)              drained by HomeLoop)
//! ```
//!
//! ### Publish
//! ```text
//! publish(payload)
//!   lock list
//!   ├─► for each subscription: upgrade action + filter
//!   │       ├─ any dead ──► remove from list
//!   │       └─ alive    ──► collect strategy
//!   unlock
//!   └─► for each strategy in subscription order:
//!           filter(&payload) ─ false ─► skip
//!                            └ true  ─► Delivery::deliver(action, &payload)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                                  |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------------------|
//! | **Channels**      | One channel per event kind, looked up by type.               | [`EventRegistry`], [`Event`], [`PubSubEvent`]       |
//! | **Delegates**     | Closures, fn pointers and bound methods with identity.      | [`Delegate`], [`Action`], [`Predicate`]             |
//! | **Weak refs**     | Hold a delegate weakly or strongly.                          | [`DelegateReference`], [`WeakDelegatesManager`]     |
//! | **Dispatch**      | Run handlers inline, in the background or on a home thread. | [`Dispatch`], [`Delivery`], [`HomeContext`]         |
//! | **Tokens**        | Unsubscribe by token, explicitly or on drop.                 | [`SubscriptionToken`], [`SubscriptionGuard`]        |
//! | **Errors**        | Typed subscription errors.                                   | [`EventError`]                                      |
//! | **Configuration** | Dispatch environment shared by a registry's channels.       | [`Config`], [`EventRegistryBuilder`]                |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use weakbus::{Action, DataEventArgs, Delegate, Dispatch, Event, EventRegistry, HomeContext};
//!
//! struct Saved;
//! impl Event for Saved {
//!     type Payload = DataEventArgs<String>;
//! }
//!
//! struct Status {
//!     last: parking_lot::Mutex<Option<String>>,
//! }
//!
//! impl Status {
//!     fn on_saved(&self, args: &DataEventArgs<String>) {
//!         *self.last.lock() = Some(args.value().clone());
//!     }
//! }
//!
//! let (ctx, mut home) = HomeContext::new("main");
//! let registry = EventRegistry::builder()
//!     .with_home_context(Arc::new(ctx))
//!     .build();
//!
//! let status = Arc::new(Status { last: parking_lot::Mutex::new(None) });
//! let on_saved: Action<DataEventArgs<String>> = Delegate::method(&status, Status::on_saved);
//! registry
//!     .get::<Saved>()
//!     .subscribe_on(&on_saved, Dispatch::Marshaled)
//!     .expect("home context configured");
//!
//! registry.get::<Saved>().publish(DataEventArgs::new("notes.txt".to_string()));
//! assert!(status.last.lock().is_none());
//!
//! home.run_pending();
//! assert_eq!(status.last.lock().as_deref(), Some("notes.txt"));
//! ```
mod core;
mod delegates;
mod dispatch;
mod error;
mod events;
mod subscriptions;

// ---- Public re-exports ----

pub use core::{Config, EventRegistry, EventRegistryBuilder};
pub use delegates::{Action, Delegate, DelegateReference, Predicate, WeakDelegatesManager};
pub use dispatch::{
    Background, Delivery, Dispatch, DispatchContext, HomeContext, HomeLoop, Job,
    SHARED_POOL_THREADS,
};
pub use error::EventError;
pub use events::{DataEventArgs, Event, EventBase, Payload, PubSubEvent, SubscribeOptions};
pub use subscriptions::{EventSubscription, ExecutionStrategy, SubscriptionGuard, SubscriptionToken};
