//! # Event kinds and payloads.
//!
//! A channel is identified by an [`Event`] kind: a marker type whose
//! associated [`Event::Payload`] fixes what handlers receive. Kinds that carry
//! nothing use `()`.
//!
//! ## Example
//! ```rust
//! use weakbus::Event;
//!
//! #[derive(Clone)]
//! struct Order { id: u64 }
//!
//! struct OrderPlaced;
//! impl Event for OrderPlaced { type Payload = Order; }
//!
//! struct CacheFlushed;
//! impl Event for CacheFlushed { type Payload = (); }
//! ```

/// Values that can travel through a channel.
///
/// `Clone` because background and marshaled deliveries each take their own copy.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Payload for T {}

/// Marker type naming one channel kind.
pub trait Event: 'static {
    /// What handlers of this kind receive.
    type Payload: Payload;
}
