//! Dispatch strategies: where and when a handler runs.
//!
//! ## Contents
//! - [`Dispatch`] option chosen at subscribe time
//! - [`Delivery`] resolved variant with its execution context ([`Background`] pool or home context)
//! - [`DispatchContext`] seam for marshaled delivery, with [`HomeContext`] / [`HomeLoop`] as the
//!   built-in implementation

mod context;
mod delivery;
mod home;

pub use context::{Dispatch, DispatchContext, Job};
pub use delivery::{Background, Delivery, SHARED_POOL_THREADS};
pub use home::{HomeContext, HomeLoop};
