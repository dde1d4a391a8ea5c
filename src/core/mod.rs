//! Registry core: configuration and channel lookup.
//!
//! - [`EventRegistry`]: one channel per event kind, created lazily;
//! - [`EventRegistryBuilder`]: fills in the dispatch environment;
//! - [`Config`]: home context and runtime inherited by every channel.

mod builder;
mod config;
mod registry;

pub use builder::EventRegistryBuilder;
pub use config::Config;
pub use registry::EventRegistry;
