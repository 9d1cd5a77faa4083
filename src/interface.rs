//! Threaded interface for running searches next to a single threaded host.
//!
//! Every search gets its own worker thread that draws matchables (stage one) and a
//! [`LaneHandle`] it uses to hand each batch over to the host's authoritative lane
//! (stage two). The host drains that lane through a [`LaneExecutor`], either once per
//! tick with [`LaneExecutor::run_pending`] or on a dedicated thread with
//! [`LaneExecutor::spawn`]. Cancellation is cooperative via a shared [`CancelToken`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, SearchError};
use crate::search::{Cycle, Search, SearchContext, SearchSummary};

/// Cancellation token shared with the worker thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);
impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
    /// Whether both tokens control the same search.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// Create a connected lane handle and executor.
pub fn lane() -> (LaneHandle, LaneExecutor) {
    let (jobs, queue) = mpsc::channel();
    (LaneHandle { jobs }, LaneExecutor { queue })
}

/// Submits work to the authoritative lane. Cheap to clone, one per search.
#[derive(Debug, Clone)]
pub struct LaneHandle {
    jobs: Sender<Job>,
}

impl LaneHandle {
    /// Run `job` on the authoritative lane and block until it finished.
    ///
    /// Fails with [`SearchError::Handoff`] when the executor is gone or the job panicked.
    pub fn call<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply, result) = mpsc::sync_channel(1);
        let wrapped: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(job)).map_err(panic_message);
            // the caller may have given up waiting
            let _ = reply.send(outcome);
        });
        self.jobs
            .send(wrapped)
            .map_err(|_| SearchError::Handoff("authoritative lane closed".to_string()))?;
        result
            .recv()
            .map_err(|_| SearchError::Handoff("job dropped before completion".to_string()))?
            .map_err(|message| SearchError::Handoff(format!("job panicked: {message}")))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// The host side of the lane. Jobs only ever run on the thread that owns this.
#[derive(Debug)]
pub struct LaneExecutor {
    queue: Receiver<Job>,
}

impl LaneExecutor {
    /// Run every job queued right now, returning how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.queue.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Run jobs as they arrive until `done` returns true, checking at least every `poll`.
    pub fn run_until(&self, poll: Duration, mut done: impl FnMut() -> bool) {
        while !done() {
            match self.queue.recv_timeout(poll) {
                Ok(job) => job(),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    /// Serve the lane from a dedicated thread until every handle is dropped.
    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || {
            for job in self.queue.iter() {
                job();
            }
            debug!("authoritative lane closed");
        })
    }
}

/// Handle to a running or finished search.
#[derive(Debug)]
pub struct SearchHandle {
    id: Uuid,
    cancel: CancelToken,
    started: Instant,
    join: Option<JoinHandle<Option<SearchSummary>>>,
}

impl SearchHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }
    /// Request cancellation (cooperative). The worker observes it within one cycle.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(|join| join.is_finished())
    }
    /// Wait for the search to end. `None` when it was cancelled or the worker died.
    pub fn join(mut self) -> Option<SearchSummary> {
        let join = self.join.take()?;
        match join.join() {
            Ok(summary) => summary,
            Err(_) => {
                warn!(search = %self.id, "search worker panicked");
                None
            }
        }
    }
    /// Elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Run `search` on its own worker thread, one cycle per configured interval.
pub fn schedule(mut search: Search, ctx: SearchContext, cancel: CancelToken) -> SearchHandle {
    let id = search.id();
    let interval = search.settings().cycle_interval();
    let cancel_for_thread = cancel.clone();
    let join = thread::Builder::new()
        .name(format!("invsearch-{id}"))
        .spawn(move || loop {
            match search.cycle(&ctx, &cancel_for_thread) {
                Cycle::Continue => thread::sleep(interval),
                Cycle::Completed => return Some(search.summary()),
                Cycle::Cancelled => {
                    info!(search = %id, polls = search.polls(), "search cancelled");
                    return None;
                }
            }
        });
    let join = match join {
        Ok(join) => Some(join),
        Err(e) => {
            warn!(search = %id, error = %e, "could not spawn search worker");
            None
        }
    };
    SearchHandle { id, cancel, started: Instant::now(), join }
}
