//! Hook Context
//!
//! A [`Context`] is built by the scheduler for every hook call and every task
//! callback. It borrows the calling application's [`AppFlags`] and the
//! scheduler's shared [`Services`], so everything an application does to the
//! outside world happens on the main path, between two hook calls.

use std::collections::VecDeque;
use std::future::Future;

use crate::app::{AppFlags, AppId, Application, HookResult};
use crate::attention::{AttentionQueue, Priority};
use crate::tasks::{SubmitError, TaskBridge, TaskId, TaskResult};

/// Scheduler-owned state reachable from hooks
pub(crate) struct Services {
    pub(crate) tasks: TaskBridge,
    pub(crate) attention: AttentionQueue,
    pub(crate) active: Option<AppId>,
    pub(crate) running: bool,
    pub(crate) launch_requests: VecDeque<String>,
}

impl Services {
    pub(crate) fn new(tasks: TaskBridge) -> Self {
        Self {
            tasks,
            attention: AttentionQueue::new(),
            active: None,
            running: true,
            launch_requests: VecDeque::new(),
        }
    }
}

/// Per-call handle an application uses to talk to the scheduler
pub struct Context<'a> {
    app: AppId,
    flags: &'a mut AppFlags,
    services: &'a mut Services,
}

impl<'a> Context<'a> {
    pub(crate) fn new(app: AppId, flags: &'a mut AppFlags, services: &'a mut Services) -> Self {
        Self {
            app,
            flags,
            services,
        }
    }

    /// ID of the application this context belongs to
    #[must_use]
    pub fn app_id(&self) -> AppId {
        self.app
    }

    /// Whether this application is currently foreground
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.services.active == Some(self.app)
    }

    /// Request a render on the next dirty check
    pub fn mark_dirty(&mut self) {
        self.flags.dirty = true;
    }

    /// Whether a render is pending
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.flags.dirty
    }

    /// Ask for a blocking text-entry capture
    ///
    /// The scheduler calls [`Application::capture_text`] later in the same
    /// frame (or once the help overlay closes).
    pub fn request_text_input(&mut self) {
        self.flags.needs_keyboard = true;
    }

    /// Ask to become the foreground application
    ///
    /// Returns `false` when the request was ignored: the application is
    /// already foreground, or an equal or higher priority request from it is
    /// already queued.
    pub fn request_attention(&mut self, priority: Priority) -> bool {
        if self.is_active() {
            tracing::debug!(app = %self.app, %priority, "Attention request from active app ignored");
            return false;
        }
        self.services.attention.request(self.app, priority)
    }

    /// Run `work` off the main path and deliver its result to `on_complete`
    ///
    /// The callback runs on the main path during a later frame, exactly once,
    /// with `A` being the concrete type of the submitting application. Results
    /// arrive in completion order; compare [`TaskId`]s to detect stale ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge refuses the task (owner retired,
    /// in-flight limit reached, shutting down).
    pub fn submit<A, T, W, C>(&mut self, work: W, on_complete: C) -> Result<TaskId, SubmitError>
    where
        A: Application,
        T: Send + 'static,
        W: FnOnce() -> anyhow::Result<T> + Send + 'static,
        C: FnOnce(&mut A, &mut Context<'_>, TaskResult<T>) -> HookResult + 'static,
    {
        self.services.tasks.submit(self.app, work, on_complete)
    }

    /// Run a future off the main path and deliver its output to `on_complete`
    ///
    /// Same delivery guarantees as [`submit`](Self::submit).
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge refuses the task.
    pub fn submit_async<A, T, F, C>(&mut self, future: F, on_complete: C) -> Result<TaskId, SubmitError>
    where
        A: Application,
        T: Send + 'static,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        C: FnOnce(&mut A, &mut Context<'_>, TaskResult<T>) -> HookResult + 'static,
    {
        self.services.tasks.submit_async(self.app, future, on_complete)
    }

    /// Drop the result of a task this application submitted
    ///
    /// The work itself keeps running; its callback is never invoked. Returns
    /// whether the task was still pending.
    pub fn cancel_task(&mut self, id: TaskId) -> bool {
        self.services.tasks.cancel_owned(self.app, id)
    }

    /// Number of this application's tasks still awaiting delivery
    #[must_use]
    pub fn tasks_in_flight(&self) -> usize {
        self.services.tasks.in_flight_for(self.app)
    }

    /// Ask the scheduler to launch (or switch to) a catalog application
    ///
    /// Applied right after the current hook returns.
    pub fn launch(&mut self, catalog_id: impl Into<String>) {
        self.services.launch_requests.push_back(catalog_id.into());
    }

    /// Stop the runtime after the current frame
    pub fn quit(&mut self) {
        tracing::info!(app = %self.app, "Application requested shutdown");
        self.services.running = false;
    }
}
