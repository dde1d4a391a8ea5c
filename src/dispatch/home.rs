//! # Home-thread dispatch queue.
//!
//! [`HomeContext`] is a cloneable [`DispatchContext`] backed by an unbounded
//! queue; [`HomeLoop`] is the single consumer that runs the jobs. Whoever
//! drives the loop *is* the home thread.
//!
//! ## Architecture
//! ```text
//! publisher threads                              home thread
//!   Marshaled strategy ──post(job)──► [queue] ──► HomeLoop ──► job()
//!   Marshaled strategy ──post(job)──┘                  └─► panic caught → error!
//! ```
//!
//! ## Driving the loop
//! - [`HomeLoop::run_pending`] drains what is queued now (GUI-style pumping, tests);
//! - [`HomeLoop::run_blocking`] runs until every [`HomeContext`] is dropped;
//! - [`HomeLoop::run`] async variant, stops on cancellation or close;
//! - [`HomeLoop::spawn_thread`] moves the loop onto a dedicated OS thread.
//!
//! ## Rules
//! - Jobs run one at a time, in post order.
//! - A panicking job is logged and does not stop the loop.
//! - Posting after the loop is gone drops the job with a warning.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::context::{DispatchContext, Job};

/// Producer side of a home-thread queue.
#[derive(Clone, Debug)]
pub struct HomeContext {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Job>,
}

/// Consumer side of a home-thread queue.
#[derive(Debug)]
pub struct HomeLoop {
    name: Arc<str>,
    rx: mpsc::UnboundedReceiver<Job>,
}

impl HomeContext {
    /// Creates a connected context/loop pair.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(name: impl Into<Arc<str>>) -> (HomeContext, HomeLoop) {
        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        (
            HomeContext {
                name: Arc::clone(&name),
                tx,
            },
            HomeLoop { name, rx },
        )
    }

    /// True once the loop side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl DispatchContext for HomeContext {
    fn post(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!(context = %self.name, "home loop closed; dropping marshaled job");
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl HomeLoop {
    /// Runs every job queued right now on the calling thread.
    ///
    /// Returns the number of jobs executed. Jobs posted by those jobs are
    /// picked up in the same call.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            self.execute(job);
            ran += 1;
        }
        ran
    }

    /// Runs jobs until every [`HomeContext`] handle is dropped.
    ///
    /// Blocks the calling thread; do not call from inside an async runtime.
    pub fn run_blocking(mut self) {
        debug!(context = %self.name, "home loop started");
        while let Some(job) = self.rx.blocking_recv() {
            self.execute(job);
        }
        debug!(context = %self.name, "home loop finished");
    }

    /// Async variant of [`Self::run_blocking`] that also stops on `token`.
    ///
    /// Jobs still queued at cancellation are dropped.
    pub async fn run(mut self, token: CancellationToken) {
        debug!(context = %self.name, "home loop started");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                job = self.rx.recv() => match job {
                    Some(job) => self.execute(job),
                    None => break,
                }
            }
        }
        debug!(context = %self.name, "home loop finished");
    }

    /// Runs the loop on a dedicated, named OS thread.
    pub fn spawn_thread(self) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("home-{}", self.name))
            .spawn(move || self.run_blocking())
    }

    fn execute(&self, job: Job) {
        if let Err(panic_err) = panic::catch_unwind(AssertUnwindSafe(job)) {
            error!(
                context = %self.name,
                panic = ?panic_err,
                "marshaled handler panicked"
            );
        }
    }
}
