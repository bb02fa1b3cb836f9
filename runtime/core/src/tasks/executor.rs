//! Task Executors
//!
//! An [`Executor`] decides where submitted work actually runs. The bridge
//! only needs jobs to run somewhere other than the frame loop and to report
//! back through their completion slot.
//!
//! | Executor            | Blocking work           | Futures                       |
//! |---------------------|-------------------------|-------------------------------|
//! | [`TokioExecutor`]   | `spawn_blocking`        | `spawn` on the runtime        |
//! | [`ThreadExecutor`]  | one named OS thread     | thread + current-thread rt    |
//! | [`InlineExecutor`]  | at submission           | `block_on` at submission      |
//! | [`DeferredExecutor`]| when the caller says so | when the caller says so       |

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A unit of blocking work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A unit of async work
pub type AsyncJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Something that can run jobs off the main path
///
/// Jobs report their own completion; an executor that drops a job without
/// running it causes the task to be delivered as abandoned.
pub trait Executor: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Run blocking work
    fn execute(&self, job: Job);

    /// Run async work
    fn execute_async(&self, job: AsyncJob);
}

// =============================================================================
// Tokio
// =============================================================================

/// Runs jobs on a tokio runtime
#[derive(Clone, Debug)]
pub struct TokioExecutor {
    handle: tokio::runtime::Handle,
}

impl TokioExecutor {
    /// Use the given runtime
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running in, if any
    #[must_use]
    pub fn try_current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn name(&self) -> &'static str {
        "tokio"
    }

    fn execute(&self, job: Job) {
        drop(self.handle.spawn_blocking(job));
    }

    fn execute_async(&self, job: AsyncJob) {
        drop(self.handle.spawn(job));
    }
}

// =============================================================================
// OS threads
// =============================================================================

/// Runs every job on its own OS thread
///
/// Futures get a private current-thread tokio runtime so they can use timers
/// and I/O.
#[derive(Clone, Debug, Default)]
pub struct ThreadExecutor;

impl ThreadExecutor {
    /// Create a thread executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn spawn(job: Job) {
        static WORKER: AtomicU64 = AtomicU64::new(1);
        let name = format!("matrixos-task-{}", WORKER.fetch_add(1, Ordering::Relaxed));

        if let Err(e) = std::thread::Builder::new().name(name.clone()).spawn(job) {
            tracing::error!(thread = %name, error = %e, "Failed to spawn task worker");
        }
    }
}

impl Executor for ThreadExecutor {
    fn name(&self) -> &'static str {
        "thread"
    }

    fn execute(&self, job: Job) {
        Self::spawn(job);
    }

    fn execute_async(&self, job: AsyncJob) {
        Self::spawn(Box::new(move || {
            match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt.block_on(job),
                Err(e) => tracing::error!(error = %e, "Failed to build task runtime"),
            }
        }));
    }
}

// =============================================================================
// Inline
// =============================================================================

/// Runs jobs immediately on the submitting thread
///
/// Delivery still waits for the next drain, so callbacks never run inside the
/// hook that submitted them. Futures are driven with
/// `futures::executor::block_on` and therefore cannot rely on a tokio reactor.
#[derive(Clone, Debug, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn execute(&self, job: Job) {
        job();
    }

    fn execute_async(&self, job: AsyncJob) {
        futures::executor::block_on(job);
    }
}

// =============================================================================
// Deferred
// =============================================================================

enum DeferredJob {
    Blocking(Job),
    Async(AsyncJob),
}

impl DeferredJob {
    fn run(self) {
        match self {
            Self::Blocking(job) => job(),
            Self::Async(job) => futures::executor::block_on(job),
        }
    }
}

/// Holds jobs until the caller runs them
///
/// Lets tests choose the exact order in which tasks complete. Cloning gives
/// another handle to the same job list.
#[derive(Clone, Default)]
pub struct DeferredExecutor {
    jobs: Arc<Mutex<VecDeque<DeferredJob>>>,
}

impl DeferredExecutor {
    /// Create an empty deferred executor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs waiting to run
    #[must_use]
    pub fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Run the oldest held job; returns whether one ran
    pub fn run_next(&self) -> bool {
        let job = self.jobs.lock().pop_front();
        match job {
            Some(job) => {
                job.run();
                true
            }
            None => false,
        }
    }

    /// Run the newest held job; returns whether one ran
    pub fn run_last(&self) -> bool {
        let job = self.jobs.lock().pop_back();
        match job {
            Some(job) => {
                job.run();
                true
            }
            None => false,
        }
    }

    /// Run every held job oldest first; returns how many ran
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Drop every held job without running it
    pub fn discard_all(&self) -> usize {
        let dropped: Vec<DeferredJob> = self.jobs.lock().drain(..).collect();
        dropped.len()
    }
}

impl std::fmt::Debug for DeferredExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredExecutor")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Executor for DeferredExecutor {
    fn name(&self) -> &'static str {
        "deferred"
    }

    fn execute(&self, job: Job) {
        self.jobs.lock().push_back(DeferredJob::Blocking(job));
    }

    fn execute_async(&self, job: AsyncJob) {
        self.jobs.lock().push_back(DeferredJob::Async(job));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_inline_runs_immediately() {
        let (tx, rx) = mpsc::channel();
        InlineExecutor.execute(Box::new(move || tx.send(1).unwrap()));
        assert_eq!(rx.try_recv().unwrap(), 1);
    }

    #[test]
    fn test_deferred_holds_jobs_until_run() {
        let exec = DeferredExecutor::new();
        let (tx, rx) = mpsc::channel();
        for i in 0..3 {
            let tx = tx.clone();
            exec.execute(Box::new(move || tx.send(i).unwrap()));
        }

        assert_eq!(exec.pending(), 3);
        assert!(rx.try_recv().is_err());

        assert!(exec.run_last());
        assert_eq!(exec.run_all(), 2);
        assert!(!exec.run_next());

        let order: Vec<i32> = rx.try_iter().collect();
        assert_eq!(order, vec![2, 0, 1]);
    }

    #[test]
    fn test_deferred_async_job() {
        let exec = DeferredExecutor::new();
        let (tx, rx) = mpsc::channel();
        exec.execute_async(Box::pin(async move {
            tx.send("done").unwrap();
        }));
        assert!(exec.run_next());
        assert_eq!(rx.try_recv().unwrap(), "done");
    }

    #[test]
    fn test_thread_executor_runs_off_thread() {
        let (tx, rx) = mpsc::channel();
        let caller = std::thread::current().id();
        ThreadExecutor::new().execute(Box::new(move || {
            tx.send(std::thread::current().id()).unwrap();
        }));
        let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_ne!(worker, caller);
    }

    #[test]
    fn test_thread_executor_runs_futures_with_timers() {
        let (tx, rx) = mpsc::channel();
        ThreadExecutor::new().execute_async(Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(1)).await;
            tx.send(true).unwrap();
        }));
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn test_thread_executor_result_is_awaitable() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        ThreadExecutor::new().execute_async(Box::pin(async move {
            let _ = tx.send(42);
        }));
        assert_eq!(tokio_test::block_on(rx).unwrap(), 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tokio_executor() {
        let exec = TokioExecutor::try_current().expect("inside a runtime");
        let (tx, rx) = tokio::sync::oneshot::channel();
        exec.execute(Box::new(move || {
            let _ = tx.send(7);
        }));
        assert_eq!(rx.await.unwrap(), 7);
    }
}
