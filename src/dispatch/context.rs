//! # Dispatch options and the home-context seam.
//!
//! [`Dispatch`] is what a caller picks at subscribe time. [`DispatchContext`]
//! is the abstraction behind [`Dispatch::Marshaled`]: anything that can accept
//! a job and run it later on its own thread, in post order.

/// Unit of work posted to a dispatch context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where a subscriber's handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// Synchronously on the publisher's thread, before `publish` returns.
    #[default]
    Direct,
    /// On a worker pool; fire-and-forget.
    Background,
    /// Posted to the channel's home context; runs on that thread in post order.
    Marshaled,
}

impl Dispatch {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Dispatch::Direct => "direct",
            Dispatch::Background => "background",
            Dispatch::Marshaled => "marshaled",
        }
    }
}

/// Execution context that runs posted jobs on a designated thread.
///
/// ### Implementation requirements
/// - `post` must not block and must not run the job inline.
/// - Jobs posted from one thread run in the order they were posted.
/// - A context that can no longer run jobs should drop them (and may log).
pub trait DispatchContext: Send + Sync + 'static {
    /// Queues `job` for execution on the context's thread.
    fn post(&self, job: Job);

    /// Returns the context name used in logs.
    ///
    /// The default uses `type_name::<Self>()`; override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
