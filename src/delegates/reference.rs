//! # Strong-or-weak reference to a [`Delegate`].
//!
//! [`DelegateReference`] is how a subscription holds its handler and filter.
//! It is built once and never switches mode:
//!
//! ```text
//! keep_alive = true   ─► Strong(Delegate)         target() always Some
//! keep_alive = false  ─► Weak(WeakDelegate)       target() rebinds on demand,
//!                                                 None once the receiver is gone
//! ```
//!
//! Static delegates held weakly are never considered dead.

use std::fmt;

use super::delegate::{Delegate, WeakDelegate};

/// Reference to a callable that may or may not keep its receiver alive.
pub struct DelegateReference<P, R = ()> {
    target: Target<P, R>,
}

enum Target<P, R> {
    Strong(Delegate<P, R>),
    Weak(WeakDelegate<P, R>),
}

impl<P: 'static, R: 'static> DelegateReference<P, R> {
    /// Creates a reference to `delegate`.
    ///
    /// With `keep_alive = false` no strong handle to the receiver is kept:
    /// the caller's own handles decide how long the target lives.
    pub fn new(delegate: &Delegate<P, R>, keep_alive: bool) -> Self {
        let target = if keep_alive {
            Target::Strong(delegate.clone())
        } else {
            Target::Weak(delegate.downgrade())
        };
        Self { target }
    }

    /// Resolves the referenced callable, or `None` if its receiver was dropped.
    pub fn target(&self) -> Option<Delegate<P, R>> {
        match &self.target {
            Target::Strong(delegate) => Some(delegate.clone()),
            Target::Weak(weak) => weak.upgrade(),
        }
    }

    /// Compares against `other` without rebuilding the target.
    ///
    /// - strong: identity equality; `None` never matches.
    /// - weak, `None`: true iff receiver-bound and the receiver is gone.
    /// - weak, `Some`: same live receiver and same method.
    pub fn target_equals(&self, other: Option<&Delegate<P, R>>) -> bool {
        match (&self.target, other) {
            (Target::Strong(delegate), Some(other)) => delegate == other,
            (Target::Strong(_), None) => false,
            (Target::Weak(weak), None) => !weak.is_static() && !weak.is_alive(),
            (Target::Weak(weak), Some(other)) => {
                weak.is_alive() && weak.identity() == other.identity()
            }
        }
    }

    /// True while [`Self::target`] would return `Some`.
    pub fn is_alive(&self) -> bool {
        match &self.target {
            Target::Strong(_) => true,
            Target::Weak(weak) => weak.is_alive(),
        }
    }

    /// True if this reference holds its target strongly.
    pub fn keeps_alive(&self) -> bool {
        matches!(self.target, Target::Strong(_))
    }
}

impl<P: 'static, R: 'static> fmt::Debug for DelegateReference<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateReference")
            .field("keep_alive", &self.keeps_alive())
            .field("alive", &self.is_alive())
            .finish()
    }
}
