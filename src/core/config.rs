//! # Registry configuration.
//!
//! Provides [`Config`], the dispatch environment every channel created by an
//! [`EventRegistry`](crate::EventRegistry) inherits.
//!
//! ## Field semantics
//! - `home_context = None` → `Dispatch::Marshaled` subscriptions fail with
//!   `EventError::NoDispatchContext`
//! - `runtime = None` → each background job goes to the publisher's tokio
//!   runtime if it is on one, otherwise to the crate's shared pool

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::dispatch::DispatchContext;

/// Dispatch environment shared by all channels of a registry.
///
/// All fields are public; [`EventRegistryBuilder`](crate::EventRegistryBuilder)
/// is the usual way to fill them.
#[derive(Clone, Default)]
pub struct Config {
    /// Context that runs `Dispatch::Marshaled` handlers (usually a [`HomeContext`](crate::HomeContext)).
    pub home_context: Option<Arc<dyn DispatchContext>>,

    /// Runtime whose blocking pool runs `Dispatch::Background` handlers.
    ///
    /// Captured when a subscription is created. Jobs it drops after shutting
    /// down are rerouted to the shared pool.
    pub runtime: Option<Handle>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("home_context", &self.home_context.as_ref().map(|ctx| ctx.name()))
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}
