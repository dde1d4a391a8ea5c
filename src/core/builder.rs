use std::sync::Arc;

use tokio::runtime::Handle;

use super::{config::Config, registry::EventRegistry};
use crate::dispatch::DispatchContext;

/// Builder for an [`EventRegistry`] with a non-default dispatch environment.
#[derive(Debug, Default)]
pub struct EventRegistryBuilder {
    cfg: Config,
}

impl EventRegistryBuilder {
    /// Creates a builder from an existing configuration.
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }

    /// Sets the context marshaled handlers run on.
    pub fn with_home_context(mut self, context: Arc<dyn DispatchContext>) -> Self {
        self.cfg.home_context = Some(context);
        self
    }

    /// Pins background handlers to `runtime`'s blocking pool.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.cfg.runtime = Some(runtime);
        self
    }

    /// Builds the registry. Channels are created lazily on first lookup.
    pub fn build(self) -> EventRegistry {
        EventRegistry::with_config(self.cfg)
    }
}
