//! Callables and the references the bus keeps to them.
//!
//! ## Contents
//! - [`Delegate`] callable with a receiver identity ([`Action`], [`Predicate`])
//! - [`DelegateReference`] strong or weak handle to a delegate
//! - [`WeakDelegatesManager`] flat list of weak listeners

mod delegate;
mod reference;
mod weak_manager;

pub use delegate::{Action, Delegate, Predicate};
pub use reference::DelegateReference;
pub use weak_manager::WeakDelegatesManager;
