//! Task Bridge - Off-Path Work with Main-Path Delivery
//!
//! Applications run slow work (network fetches, file parsing) through the
//! bridge so the frame loop never blocks. Work runs on an [`Executor`];
//! results come back through a single completion channel that the scheduler
//! drains once per frame.
//!
//! # Architecture
//!
//! ```text
//!   hook ──submit──► TaskBridge ──job──► Executor (worker)
//!                       │                     │
//!                pending callbacks       CompletionSlot
//!                       │                     │
//!                       ◄────── mpsc (many producers) ──┘
//!                       │
//!   scheduler ──drain_completed()──► Delivery ──deliver()──► callback (main path)
//! ```
//!
//! # Guarantees
//!
//! - Every task is delivered at most once, and exactly once unless it is
//!   cancelled or its owner is retired first.
//! - Callbacks run only on the thread that drains the bridge.
//! - Deliveries come out in completion order, not submission order.
//! - A panic in the work becomes [`TaskError::Panicked`]; an executor that
//!   drops the work without running it yields [`TaskError::Abandoned`].

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tokio::sync::mpsc;

use super::executor::Executor;
use crate::app::{downcast_mut, panic_message, AppId, Application, HookResult};
use crate::context::Context;

// =============================================================================
// Identifiers and Errors
// =============================================================================

/// Unique identifier for a submitted task
///
/// IDs increase with submission order, so an application can tell which of
/// two racing results is newer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Why a task did not produce a value
#[derive(Debug, Error)]
pub enum TaskError {
    /// The work returned an error
    #[error("task failed: {0:#}")]
    Failed(anyhow::Error),

    /// The work panicked
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The executor dropped the work without running it
    #[error("task abandoned before completion")]
    Abandoned,

    /// The callback could not be matched to its value or application type
    #[error("task result type mismatch")]
    TypeMismatch,
}

/// Outcome handed to a task callback
pub type TaskResult<T> = Result<T, TaskError>;

/// Why a submission was refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The owning application was unregistered or faulted
    #[error("owner {0} no longer accepts tasks")]
    OwnerRetired(AppId),

    /// The in-flight limit was reached
    #[error("too many tasks in flight (limit: {limit}, current: {current})")]
    TooManyInFlight {
        /// Configured limit
        limit: usize,
        /// Tasks currently awaiting delivery
        current: usize,
    },

    /// The bridge is shutting down
    #[error("task bridge is shut down")]
    ShutDown,
}

// =============================================================================
// Completion Plumbing
// =============================================================================

type Outcome = Result<Box<dyn Any + Send>, TaskError>;

type DeliverFn = Box<dyn FnOnce(&mut dyn Application, &mut Context<'_>, Outcome) -> HookResult>;

struct Completion {
    id: TaskId,
    outcome: Outcome,
}

/// Worker-side handle that reports a task's outcome exactly once
///
/// Dropping it unreported (executor shut down, thread failed to spawn)
/// reports [`TaskError::Abandoned`].
struct CompletionSlot {
    id: TaskId,
    tx: Option<mpsc::UnboundedSender<Completion>>,
}

impl CompletionSlot {
    fn complete(mut self, outcome: Outcome) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Completion {
                id: self.id,
                outcome,
            });
        }
    }
}

impl Drop for CompletionSlot {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Completion {
                id: self.id,
                outcome: Err(TaskError::Abandoned),
            });
        }
    }
}

fn settle<T: Send + 'static>(result: Result<anyhow::Result<T>, Box<dyn Any + Send>>) -> Outcome {
    match result {
        Ok(Ok(value)) => Ok(Box::new(value)),
        Ok(Err(e)) => Err(TaskError::Failed(e)),
        Err(panic) => Err(TaskError::Panicked(panic_message(panic.as_ref()))),
    }
}

struct PendingTask {
    owner: AppId,
    deliver: DeliverFn,
}

/// A completed task ready to be handed to its owner
pub struct Delivery {
    id: TaskId,
    owner: AppId,
    deliver: DeliverFn,
    outcome: Outcome,
}

impl Delivery {
    /// Task that completed
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Application that submitted it
    #[must_use]
    pub fn owner(&self) -> AppId {
        self.owner
    }

    /// Whether the work produced a value
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Invoke the callback with the owning application
    pub(crate) fn deliver(self, app: &mut dyn Application, cx: &mut Context<'_>) -> HookResult {
        (self.deliver)(app, cx, self.outcome)
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("succeeded", &self.succeeded())
            .finish_non_exhaustive()
    }
}

/// Counters for bridge activity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Tasks accepted
    pub submitted: u64,
    /// Tasks handed to their owner
    pub delivered: u64,
    /// Delivered tasks whose work failed, panicked or was abandoned
    pub failed: u64,
    /// Completed tasks dropped because they were cancelled or their owner retired
    pub suppressed: u64,
    /// Submissions refused
    pub rejected: u64,
}

// =============================================================================
// Task Bridge
// =============================================================================

/// Runs work off the main path and hands results back on it
pub struct TaskBridge {
    executor: Arc<dyn Executor>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    pending: HashMap<TaskId, PendingTask>,
    retired: HashSet<AppId>,
    max_in_flight: usize,
    accepting: bool,
    stats: TaskStats,
}

impl TaskBridge {
    /// Create a bridge running work on `executor`
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            executor,
            tx,
            rx,
            pending: HashMap::new(),
            retired: HashSet::new(),
            max_in_flight: 0,
            accepting: true,
            stats: TaskStats::default(),
        }
    }

    /// Limit the number of tasks awaiting delivery (0 = unlimited)
    #[must_use]
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = limit;
        self
    }

    /// Name of the executor in use
    #[must_use]
    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Submit blocking work on behalf of `owner`
    ///
    /// # Errors
    ///
    /// Returns an error if the owner is retired, the in-flight limit is
    /// reached, or the bridge is shut down.
    pub fn submit<A, T, W, C>(&mut self, owner: AppId, work: W, on_complete: C) -> Result<TaskId, SubmitError>
    where
        A: Application,
        T: Send + 'static,
        W: FnOnce() -> anyhow::Result<T> + Send + 'static,
        C: FnOnce(&mut A, &mut Context<'_>, TaskResult<T>) -> HookResult + 'static,
    {
        let slot = self.admit::<A, T, C>(owner, on_complete)?;
        let id = slot.id;
        self.executor.execute(Box::new(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(work));
            slot.complete(settle(result));
        }));
        Ok(id)
    }

    /// Submit a future on behalf of `owner`
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub fn submit_async<A, T, F, C>(
        &mut self,
        owner: AppId,
        future: F,
        on_complete: C,
    ) -> Result<TaskId, SubmitError>
    where
        A: Application,
        T: Send + 'static,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        C: FnOnce(&mut A, &mut Context<'_>, TaskResult<T>) -> HookResult + 'static,
    {
        let slot = self.admit::<A, T, C>(owner, on_complete)?;
        let id = slot.id;
        self.executor.execute_async(Box::pin(async move {
            let result = AssertUnwindSafe(future).catch_unwind().await;
            slot.complete(settle(result));
        }));
        Ok(id)
    }

    /// Check limits, record the callback and hand out a completion slot
    fn admit<A, T, C>(&mut self, owner: AppId, on_complete: C) -> Result<CompletionSlot, SubmitError>
    where
        A: Application,
        T: Send + 'static,
        C: FnOnce(&mut A, &mut Context<'_>, TaskResult<T>) -> HookResult + 'static,
    {
        let refused = if !self.accepting {
            Some(SubmitError::ShutDown)
        } else if self.retired.contains(&owner) {
            Some(SubmitError::OwnerRetired(owner))
        } else if self.max_in_flight > 0 && self.pending.len() >= self.max_in_flight {
            Some(SubmitError::TooManyInFlight {
                limit: self.max_in_flight,
                current: self.pending.len(),
            })
        } else {
            None
        };
        if let Some(e) = refused {
            self.stats.rejected += 1;
            tracing::warn!(app = %owner, error = %e, "Task submission refused");
            return Err(e);
        }

        let id = TaskId::next();
        let deliver: DeliverFn = Box::new(
            move |app: &mut dyn Application, cx: &mut Context<'_>, outcome: Outcome| {
                let result = outcome.and_then(|value| {
                    value
                        .downcast::<T>()
                        .map(|boxed| *boxed)
                        .map_err(|_| TaskError::TypeMismatch)
                });
                match downcast_mut::<A>(app) {
                    Some(app) => on_complete(app, cx, result),
                    None => Err(TaskError::TypeMismatch.into()),
                }
            },
        );
        self.pending.insert(id, PendingTask { owner, deliver });
        self.stats.submitted += 1;

        tracing::debug!(app = %owner, task = %id, executor = self.executor.name(), "Task submitted");

        Ok(CompletionSlot {
            id,
            tx: Some(self.tx.clone()),
        })
    }

    /// Take every completed task, in completion order
    ///
    /// Completions for cancelled tasks or retired owners are dropped here.
    pub fn drain_completed(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        while let Ok(Completion { id, outcome }) = self.rx.try_recv() {
            let Some(PendingTask { owner, deliver }) = self.pending.remove(&id) else {
                self.stats.suppressed += 1;
                tracing::debug!(task = %id, "Dropping result of cancelled task");
                continue;
            };
            if let Err(e) = &outcome {
                self.stats.failed += 1;
                tracing::debug!(app = %owner, task = %id, error = %e, "Task completed with failure");
            }
            self.stats.delivered += 1;
            deliveries.push(Delivery {
                id,
                owner,
                deliver,
                outcome,
            });
        }
        deliveries
    }

    /// Drop the pending callback for `id`
    ///
    /// Returns whether the task was still pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let cancelled = self.pending.remove(&id).is_some();
        if cancelled {
            tracing::debug!(task = %id, "Task cancelled");
        }
        cancelled
    }

    /// Cancel `id` only if `owner` submitted it
    pub(crate) fn cancel_owned(&mut self, owner: AppId, id: TaskId) -> bool {
        match self.pending.get(&id) {
            Some(task) if task.owner == owner => self.cancel(id),
            _ => false,
        }
    }

    /// Stop delivering to `owner` and refuse its future submissions
    ///
    /// Returns how many pending tasks were dropped.
    pub fn retire_owner(&mut self, owner: AppId) -> usize {
        self.retired.insert(owner);
        let before = self.pending.len();
        self.pending.retain(|_, task| task.owner != owner);
        let dropped = before - self.pending.len();
        if dropped > 0 {
            tracing::debug!(app = %owner, dropped, "Retired owner with pending tasks");
        }
        dropped
    }

    /// Whether `owner` has been retired
    #[must_use]
    pub fn is_retired(&self, owner: AppId) -> bool {
        self.retired.contains(&owner)
    }

    /// Refuse new work and forget every pending callback
    pub fn shutdown(&mut self) {
        self.accepting = false;
        let dropped = self.pending.len();
        self.pending.clear();
        while self.rx.try_recv().is_ok() {}
        tracing::info!(dropped, "Task bridge shut down");
    }

    /// Accept work again after [`shutdown`](Self::shutdown)
    pub fn reopen(&mut self) {
        if !self.accepting {
            self.accepting = true;
            tracing::debug!("Task bridge reopened");
        }
    }

    /// Tasks awaiting delivery
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Tasks of `owner` awaiting delivery
    #[must_use]
    pub fn in_flight_for(&self, owner: AppId) -> usize {
        self.pending.values().filter(|t| t.owner == owner).count()
    }

    /// Activity counters
    #[must_use]
    pub fn stats(&self) -> TaskStats {
        self.stats
    }
}

impl fmt::Debug for TaskBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBridge")
            .field("executor", &self.executor.name())
            .field("in_flight", &self.pending.len())
            .field("max_in_flight", &self.max_in_flight)
            .field("accepting", &self.accepting)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
