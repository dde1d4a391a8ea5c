//! # Callables with a receiver identity.
//!
//! [`Delegate`] is the unit the bus stores for handlers and filters: a
//! callable of shape `Fn(&P) -> R` that also knows **what object it is bound
//! to**. That identity is what lets the bus hold it weakly.
//!
//! ## Forms
//! ```text
//! Delegate::from_fn(f)          static fn pointer   receiver: none      never dies
//! Delegate::new(closure)        boxed closure       receiver: closure   dies with the last Delegate clone
//! Delegate::method(&arc, m)     bound method        receiver: Arc<T>    dies with the last Arc<T>
//! ```
//!
//! Two delegates are equal when they share the same receiver object and the
//! same method (for closures, the closure allocation is the receiver).

use std::fmt;
use std::sync::{Arc, Weak};

/// Handler shape: called with the payload, returns nothing.
pub type Action<P> = Delegate<P, ()>;

/// Filter shape: called with the payload, decides whether the handler runs.
pub type Predicate<P> = Delegate<P, bool>;

type ClosureFn<P, R> = dyn Fn(&P) -> R + Send + Sync;

/// Receiver address + method address. Closures have no separate method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Identity {
    receiver: Option<usize>,
    method: usize,
}

/// Callable of shape `Fn(&P) -> R` with a comparable receiver identity.
///
/// Cheap to clone: every form is either a fn pointer or an `Arc`.
pub struct Delegate<P, R = ()> {
    repr: Repr<P, R>,
}

enum Repr<P, R> {
    Static(fn(&P) -> R),
    Closure(Arc<ClosureFn<P, R>>),
    Method(Arc<dyn Bound<P, R>>),
}

/// Method bound to a strongly held receiver, with the receiver type erased.
trait Bound<P, R>: Send + Sync {
    fn call(&self, argument: &P) -> R;
    fn receiver(&self) -> usize;
    fn method(&self) -> usize;
    fn downgrade(&self) -> Box<dyn Unbound<P, R>>;
}

/// Method bound to a weakly held receiver; can be rebound while it lives.
pub(crate) trait Unbound<P, R>: Send + Sync {
    fn rebind(&self) -> Option<Delegate<P, R>>;
    fn is_alive(&self) -> bool;
    fn identity(&self) -> Identity;
}

struct MethodBinding<T, P, R> {
    receiver: Arc<T>,
    method: fn(&T, &P) -> R,
}

struct WeakMethodBinding<T, P, R> {
    receiver: Weak<T>,
    address: usize,
    method: fn(&T, &P) -> R,
}

impl<T, P, R> Bound<P, R> for MethodBinding<T, P, R>
where
    T: Send + Sync + 'static,
    P: 'static,
    R: 'static,
{
    fn call(&self, argument: &P) -> R {
        (self.method)(self.receiver.as_ref(), argument)
    }

    fn receiver(&self) -> usize {
        Arc::as_ptr(&self.receiver) as *const () as usize
    }

    fn method(&self) -> usize {
        self.method as usize
    }

    fn downgrade(&self) -> Box<dyn Unbound<P, R>> {
        Box::new(WeakMethodBinding {
            receiver: Arc::downgrade(&self.receiver),
            address: self.receiver(),
            method: self.method,
        })
    }
}

impl<T, P, R> Unbound<P, R> for WeakMethodBinding<T, P, R>
where
    T: Send + Sync + 'static,
    P: 'static,
    R: 'static,
{
    fn rebind(&self) -> Option<Delegate<P, R>> {
        let receiver = self.receiver.upgrade()?;
        Some(Delegate {
            repr: Repr::Method(Arc::new(MethodBinding {
                receiver,
                method: self.method,
            })),
        })
    }

    fn is_alive(&self) -> bool {
        self.receiver.strong_count() > 0
    }

    fn identity(&self) -> Identity {
        Identity {
            receiver: Some(self.address),
            method: self.method as usize,
        }
    }
}

impl<P: 'static, R: 'static> Delegate<P, R> {
    /// Wraps a closure. The closure allocation is the receiver: a weak
    /// subscription stays alive while any clone of this delegate does.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&P) -> R + Send + Sync + 'static,
    {
        Self {
            repr: Repr::Closure(Arc::new(f)),
        }
    }

    /// Wraps a plain function. Static delegates have no receiver and never die.
    pub fn from_fn(f: fn(&P) -> R) -> Self {
        Self {
            repr: Repr::Static(f),
        }
    }

    /// Binds `method` to `receiver`.
    ///
    /// A weak subscription built from this delegate stays alive exactly as long
    /// as some `Arc<T>` to the receiver does, regardless of the delegate itself.
    pub fn method<T>(receiver: &Arc<T>, method: fn(&T, &P) -> R) -> Self
    where
        T: Send + Sync + 'static,
    {
        Self {
            repr: Repr::Method(Arc::new(MethodBinding {
                receiver: Arc::clone(receiver),
                method,
            })),
        }
    }

    /// Invokes the callable.
    #[inline]
    pub fn call(&self, argument: &P) -> R {
        match &self.repr {
            Repr::Static(f) => f(argument),
            Repr::Closure(f) => f(argument),
            Repr::Method(m) => m.call(argument),
        }
    }

    /// True for receiver-less delegates built with [`Delegate::from_fn`].
    pub fn is_static(&self) -> bool {
        matches!(self.repr, Repr::Static(_))
    }

    pub(crate) fn identity(&self) -> Identity {
        match &self.repr {
            Repr::Static(f) => Identity {
                receiver: None,
                method: *f as usize,
            },
            Repr::Closure(f) => Identity {
                receiver: Some(Arc::as_ptr(f) as *const () as usize),
                method: 0,
            },
            Repr::Method(m) => Identity {
                receiver: Some(m.receiver()),
                method: m.method(),
            },
        }
    }

    /// Drops every strong handle, keeping only what is needed to rebind later.
    pub(crate) fn downgrade(&self) -> WeakDelegate<P, R> {
        match &self.repr {
            Repr::Static(f) => WeakDelegate::Static(*f),
            Repr::Closure(f) => WeakDelegate::Closure {
                closure: Arc::downgrade(f),
                address: Arc::as_ptr(f) as *const () as usize,
            },
            Repr::Method(m) => WeakDelegate::Method(m.downgrade()),
        }
    }
}

impl<P, R> Clone for Delegate<P, R> {
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            Repr::Static(f) => Repr::Static(*f),
            Repr::Closure(f) => Repr::Closure(Arc::clone(f)),
            Repr::Method(m) => Repr::Method(Arc::clone(m)),
        };
        Self { repr }
    }
}

impl<P: 'static, R: 'static> PartialEq for Delegate<P, R> {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl<P: 'static, R: 'static> Eq for Delegate<P, R> {}

impl<P: 'static, R: 'static> fmt::Debug for Delegate<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.repr {
            Repr::Static(_) => "static",
            Repr::Closure(_) => "closure",
            Repr::Method(_) => "method",
        };
        let id = self.identity();
        f.debug_struct("Delegate")
            .field("kind", &kind)
            .field("receiver", &id.receiver.map(|a| format!("{a:#x}")))
            .finish()
    }
}

/// Weak counterpart of [`Delegate`].
pub(crate) enum WeakDelegate<P, R> {
    Static(fn(&P) -> R),
    Closure {
        closure: Weak<ClosureFn<P, R>>,
        address: usize,
    },
    Method(Box<dyn Unbound<P, R>>),
}

impl<P: 'static, R: 'static> WeakDelegate<P, R> {
    /// Rebuilds a strong delegate; `None` once the receiver is gone.
    pub(crate) fn upgrade(&self) -> Option<Delegate<P, R>> {
        match self {
            WeakDelegate::Static(f) => Some(Delegate::from_fn(*f)),
            WeakDelegate::Closure { closure, .. } => closure.upgrade().map(|f| Delegate {
                repr: Repr::Closure(f),
            }),
            WeakDelegate::Method(m) => m.rebind(),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            WeakDelegate::Static(_) => true,
            WeakDelegate::Closure { closure, .. } => closure.strong_count() > 0,
            WeakDelegate::Method(m) => m.is_alive(),
        }
    }

    pub(crate) fn is_static(&self) -> bool {
        matches!(self, WeakDelegate::Static(_))
    }

    pub(crate) fn identity(&self) -> Identity {
        match self {
            WeakDelegate::Static(f) => Identity {
                receiver: None,
                method: *f as usize,
            },
            WeakDelegate::Closure { address, .. } => Identity {
                receiver: Some(*address),
                method: 0,
            },
            WeakDelegate::Method(m) => m.identity(),
        }
    }
}
