//! # Delivery variants.
//!
//! [`Delivery`] is the closed set of ways a resolved handler is invoked. It is
//! chosen once at subscribe time and never changes afterwards.
//!
//! ```text
//! Delivery::Direct          action(&payload) on the publisher thread
//! Delivery::Background(b)   clone payload ─► blocking pool (see below)
//! Delivery::Marshaled(ctx)  clone payload ─► ctx.post(job)      (home thread, post order)
//! ```
//!
//! ## Background pools
//! ```text
//! Background::Runtime(h)   h's blocking pool
//! Background::Ambient      publisher's runtime, else the shared pool
//!
//! job dropped unrun (runtime shut down) ─► warn!, rerouted to the shared pool
//! ```
//!
//! The shared pool is a tokio runtime built on first use; its blocking pool is
//! capped at [`SHARED_POOL_THREADS`] threads.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::thread;

use tokio::runtime::{self, Handle, Runtime};
use tracing::{error, warn};

use super::context::{Dispatch, DispatchContext, Job};
use crate::delegates::Action;
use crate::error::EventError;
use crate::events::Payload;

/// Upper bound on threads the shared background pool may start.
pub const SHARED_POOL_THREADS: usize = 16;

static SHARED_POOL: OnceLock<Result<Runtime, String>> = OnceLock::new();

fn shared_pool() -> Result<&'static Handle, EventError> {
    let pool = SHARED_POOL.get_or_init(|| {
        runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(SHARED_POOL_THREADS)
            .thread_name("weakbus-background")
            .build()
            .map_err(|err| err.to_string())
    });
    match pool {
        Ok(rt) => Ok(rt.handle()),
        Err(reason) => Err(EventError::BackgroundUnavailable {
            reason: reason.clone(),
        }),
    }
}

/// Worker pool used by [`Delivery::Background`].
#[derive(Clone, Debug, Default)]
pub enum Background {
    /// Blocking pool of a pinned tokio runtime.
    Runtime(Handle),
    /// Resolved per publish: the publisher's runtime, or the shared pool.
    #[default]
    Ambient,
}

impl Background {
    pub(crate) fn spawn(&self, job: Job) -> Result<(), EventError> {
        let handle = match self {
            Background::Runtime(handle) => handle.clone(),
            Background::Ambient => match Handle::try_current() {
                Ok(handle) => handle,
                Err(_) => return spawn_on(shared_pool()?, job),
            },
        };
        let guarded = GuardedJob { job: Some(job) };
        spawn_on(&handle, Box::new(move || guarded.run()))
    }
}

// `spawn_blocking` panics when the OS refuses a thread and the pool has none
// idle; that is reported as an error instead of unwinding through `publish`.
fn spawn_on(handle: &Handle, job: Job) -> Result<(), EventError> {
    panic::catch_unwind(AssertUnwindSafe(|| drop(handle.spawn_blocking(job)))).map_err(|_| {
        EventError::BackgroundUnavailable {
            reason: "blocking pool could not start a thread".to_string(),
        }
    })
}

/// Job that moves to the shared pool if its runtime drops it without running it.
struct GuardedJob {
    job: Option<Job>,
}

impl GuardedJob {
    fn run(mut self) {
        if let Some(job) = self.job.take() {
            job();
        }
    }
}

impl Drop for GuardedJob {
    fn drop(&mut self) {
        let Some(job) = self.job.take() else {
            return;
        };
        if thread::panicking() {
            warn!("background job dropped while unwinding");
            return;
        }
        warn!("runtime shut down before running a background job; rerouting to shared pool");
        if let Err(err) = shared_pool().and_then(|pool| spawn_on(pool, job)) {
            error!(error = %err, label = err.as_label(), "background job lost");
        }
    }
}

/// How a subscription invokes its handler.
#[derive(Clone)]
pub enum Delivery {
    /// Synchronous call on the publisher's thread.
    Direct,
    /// Fire-and-forget on a worker pool.
    Background(Background),
    /// Posted to a home context.
    Marshaled(Arc<dyn DispatchContext>),
}

impl Delivery {
    /// Returns the [`Dispatch`] option this delivery implements.
    pub fn dispatch(&self) -> Dispatch {
        match self {
            Delivery::Direct => Dispatch::Direct,
            Delivery::Background(_) => Dispatch::Background,
            Delivery::Marshaled(_) => Dispatch::Marshaled,
        }
    }

    /// Invokes `action` with `argument` according to the variant.
    ///
    /// Async variants clone the payload and return once the job is scheduled.
    /// A missing action is an invariant violation reported as
    /// [`EventError::NullAction`]; a background pool that cannot take the job
    /// is reported as [`EventError::BackgroundUnavailable`].
    pub fn deliver<P: Payload>(
        &self,
        action: Option<Action<P>>,
        argument: &P,
    ) -> Result<(), EventError> {
        let action = action.ok_or(EventError::NullAction {
            dispatch: self.dispatch().as_label(),
        })?;

        match self {
            Delivery::Direct => action.call(argument),
            Delivery::Background(pool) => {
                let argument = argument.clone();
                pool.spawn(Box::new(move || action.call(&argument)))?;
            }
            Delivery::Marshaled(context) => {
                let argument = argument.clone();
                context.post(Box::new(move || action.call(&argument)));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Direct => f.write_str("Direct"),
            Delivery::Background(pool) => f.debug_tuple("Background").field(pool).finish(),
            Delivery::Marshaled(context) => {
                f.debug_tuple("Marshaled").field(&context.name()).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegates::Delegate;
    use crate::dispatch::HomeContext;
    use parking_lot::Mutex;
    use std::sync::mpsc;
    use std::time::Duration;

    fn recorder(seen: &Arc<Mutex<Vec<String>>>) -> Action<String> {
        let seen = Arc::clone(seen);
        Delegate::new(move |v: &String| seen.lock().push(v.clone()))
    }

    #[test]
    fn direct_runs_inline() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        Delivery::Direct
            .deliver(Some(recorder(&seen)), &"hi".to_string())
            .expect("delivered");
        assert_eq!(*seen.lock(), vec!["hi".to_string()]);
    }

    #[test]
    fn every_variant_rejects_missing_action() {
        let (ctx, _home) = HomeContext::new("ui");
        let variants = [
            Delivery::Direct,
            Delivery::Background(Background::Ambient),
            Delivery::Marshaled(Arc::new(ctx)),
        ];
        for delivery in variants {
            let err = delivery
                .deliver::<String>(None, &String::new())
                .expect_err("no action");
            assert_eq!(err.as_label(), "null_action");
        }
    }

    #[test]
    fn marshaled_waits_for_the_home_loop() {
        let (ctx, mut home) = HomeContext::new("ui");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let delivery = Delivery::Marshaled(Arc::new(ctx));
        delivery
            .deliver(Some(recorder(&seen)), &"later".to_string())
            .expect("posted");

        assert!(seen.lock().is_empty());
        assert_eq!(home.run_pending(), 1);
        assert_eq!(*seen.lock(), vec!["later".to_string()]);
        assert_eq!(delivery.dispatch(), Dispatch::Marshaled);
    }

    fn thread_reporter(tx: mpsc::Sender<(u8, Option<String>)>) -> Action<u8> {
        let tx = Mutex::new(tx);
        Delegate::new(move |v: &u8| {
            let _ = tx.lock().send((*v, thread::current().name().map(str::to_owned)));
        })
    }

    #[test]
    fn background_without_runtime_uses_the_shared_pool() {
        let (tx, rx) = mpsc::channel();
        Delivery::Background(Background::Ambient)
            .deliver(Some(thread_reporter(tx)), &9)
            .expect("scheduled");

        let (value, name) = rx.recv_timeout(Duration::from_secs(5)).expect("ran");
        assert_eq!(value, 9);
        assert_eq!(name.as_deref(), Some("weakbus-background"));
    }

    #[test]
    fn shared_pool_reuses_a_bounded_set_of_threads() {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let action: Action<u8> = Delegate::new(move |_: &u8| {
            let _ = tx.lock().send(thread::current().id());
        });
        let delivery = Delivery::Background(Background::Ambient);
        for _ in 0..200 {
            delivery.deliver(Some(action.clone()), &0).expect("scheduled");
        }

        let threads: std::collections::HashSet<_> = (0..200)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).expect("ran"))
            .collect();
        assert!(threads.len() <= SHARED_POOL_THREADS, "{} threads", threads.len());
    }

    #[test]
    fn pinned_runtime_that_shut_down_reroutes_the_job() {
        let rt = tokio::runtime::Runtime::new().expect("runtime");
        let handle = rt.handle().clone();
        drop(rt);

        let (tx, rx) = mpsc::channel();
        Delivery::Background(Background::Runtime(handle))
            .deliver(Some(thread_reporter(tx)), &4)
            .expect("scheduled");

        let (value, name) = rx.recv_timeout(Duration::from_secs(5)).expect("rerouted");
        assert_eq!(value, 4);
        assert_eq!(name.as_deref(), Some("weakbus-background"));
    }

    #[tokio::test]
    async fn background_inside_runtime_uses_its_blocking_pool() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let tx = Mutex::new(Some(tx));
        let action: Action<u8> = Delegate::new(move |v: &u8| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send((*v, thread::current().name().map(str::to_owned)));
            }
        });
        Delivery::Background(Background::Ambient)
            .deliver(Some(action), &3)
            .expect("scheduled");

        let got = tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .expect("ran in time")
            .expect("sent");
        assert_eq!(got.0, 3);
        assert_ne!(got.1.as_deref(), Some("weakbus-background"));
    }
}
