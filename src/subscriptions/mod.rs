//! Subscriptions and the tokens that cancel them.
//!
//! ## Contents
//! - [`EventSubscription`] handler + filter + delivery, produces [`ExecutionStrategy`]s
//! - [`SubscriptionToken`] identity of one subscription; `dispose` unsubscribes once
//! - [`SubscriptionGuard`] disposes its token on drop

mod subscription;
mod token;

pub use subscription::{EventSubscription, ExecutionStrategy};
pub use token::{SubscriptionGuard, SubscriptionToken};
