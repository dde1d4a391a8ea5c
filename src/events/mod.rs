//! Channels: event kinds, the subscription list, and the typed channel handle.
//!
//! ## Contents
//! - [`Event`], [`Payload`] channel kind and what it carries
//! - [`EventBase`] subscription list with subscribe/unsubscribe/prune/publish
//! - [`PubSubEvent`] typed, cloneable channel handle with [`SubscribeOptions`]
//! - [`DataEventArgs`] generic single-value payload
//!
//! See `core/registry.rs` for how channels are looked up by kind.

mod base;
mod data;
mod event;
mod pubsub;

pub use base::EventBase;
pub use data::DataEventArgs;
pub use event::{Event, Payload};
pub use pubsub::{PubSubEvent, SubscribeOptions};
