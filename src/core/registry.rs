//! # Event registry - one channel per event kind.
//!
//! Maps an [`Event`] kind to exactly one [`PubSubEvent`] for the registry's
//! lifetime. Channels are created lazily on first lookup and inherit the
//! registry's [`Config`].
//!
//! ## Architecture
//! ```text
//! registry.get::<K>()
//!   lock map
//!   ├─► hit  → clone handle
//!   └─► miss → PubSubEvent::from_config(cfg) → insert → clone handle
//!   unlock
//! ```
//!
//! ## Rules
//! - Lookup and creation happen under one lock: concurrent first lookups of a
//!   kind all get the same channel.
//! - The map lock is never held while a channel is used.
//! - Channels are never removed; dropping the registry drops the map's handles.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use super::{builder::EventRegistryBuilder, config::Config};
use crate::events::{Event, PubSubEvent};

/// Registry of channels keyed by event kind.
///
/// Usually one per application, shared behind an `Arc` or owned by the
/// component that wires publishers and subscribers together.
pub struct EventRegistry {
    events: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    cfg: Config,
}

impl EventRegistry {
    /// Creates a registry without home context or pinned runtime.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a registry from an explicit configuration.
    pub fn with_config(cfg: Config) -> Self {
        Self {
            events: Mutex::new(HashMap::new()),
            cfg,
        }
    }

    /// Starts building a registry.
    pub fn builder() -> EventRegistryBuilder {
        EventRegistryBuilder::default()
    }

    /// Configuration inherited by every channel this registry creates.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Returns the channel for event kind `K`, creating it on first use.
    ///
    /// Every call with the same `K` returns a handle to the same channel.
    pub fn get<K: Event>(&self) -> PubSubEvent<K::Payload> {
        let mut events = self.events.lock();
        let slot = events.entry(TypeId::of::<K>()).or_insert_with(|| {
            debug!(event = type_name::<K>(), "creating channel");
            let channel: Box<dyn Any + Send + Sync> =
                Box::new(PubSubEvent::<K::Payload>::from_config(&self.cfg));
            channel
        });

        match slot.downcast_ref::<PubSubEvent<K::Payload>>() {
            Some(channel) => channel.clone(),
            None => unreachable!("channel for {} stored with a foreign payload", type_name::<K>()),
        }
    }

    /// Number of channels created so far.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if no channel has been looked up yet.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for EventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("channels", &self.len())
            .field("config", &self.cfg)
            .finish()
    }
}
