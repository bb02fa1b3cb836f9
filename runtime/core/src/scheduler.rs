//! Scheduler - The Cooperative Frame Loop
//!
//! The scheduler owns every registered application, the display surface, the
//! input source and the task bridge. It runs one frame at a time on a single
//! thread; the only concurrency in the runtime lives behind the task bridge.
//!
//! # Frame Order
//!
//! ```text
//!   ┌─ run_frame(now) ──────────────────────────────────────────────┐
//!   │ 1. delta since previous frame                                  │
//!   │ 2. drain task bridge ──► callbacks on the owning applications  │
//!   │ 3. poll one input event ──► ModeRouter ──► on_event / overlay  │
//!   │ 4. serve at most one attention request (switch)                │
//!   │ 5. blocking text capture, if the active app asked for it       │
//!   │ 6. on_update(delta) on the active application                  │
//!   │ 7. render overlay or application if dirty, then present        │
//!   │ 8. background tick for every other application (~1 Hz)         │
//!   └────────────────────────────────────────────────────────────────┘
//!   run() = loop { run_frame; FramePacer::wait }
//! ```
//!
//! # Faults
//!
//! Every hook runs under `catch_unwind`. A hook that returns `Err` or panics
//! is handled per [`FaultPolicy`]: isolate the application and keep going, or
//! stop and return [`SchedulerError::HookFailed`].
//!
//! # Switching
//!
//! A switch deactivates the current application, marks the new one dirty,
//! activates it and clears the surface. Pending attention requests from the
//! new foreground application are dropped, so the queue never names the
//! active application.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::app::{downcast_mut, downcast_ref, panic_message, AppFlags, AppId, Application, HookResult};
use crate::attention::Priority;
use crate::catalog::{AppCatalog, CatalogError};
use crate::config::{ExecutorKind, FaultPolicy, RuntimeConfig};
use crate::context::{Context, Services};
use crate::help::{build_help_lines, render_help, HelpLayout, HelpLine};
use crate::input::InputSource;
use crate::mode::{HelpMetrics, ModeRouter, ModeState, Route};
use crate::surface::{DeviceError, Surface};
use crate::tasks::{Executor, TaskBridge, TaskStats, ThreadExecutor, TokioExecutor};
use crate::timing::{FramePacer, TickTimer};

// =============================================================================
// Errors
// =============================================================================

/// Lifecycle hooks, as named in logs and errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    /// [`Application::on_activate`]
    Activate,
    /// [`Application::on_deactivate`]
    Deactivate,
    /// [`Application::on_update`]
    Update,
    /// [`Application::on_background_tick`]
    BackgroundTick,
    /// [`Application::on_event`]
    Event,
    /// [`Application::render`]
    Render,
    /// [`Application::capture_text`]
    CaptureText,
    /// A task completion callback
    TaskCallback,
}

impl Hook {
    /// Hook name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activate => "on_activate",
            Self::Deactivate => "on_deactivate",
            Self::Update => "on_update",
            Self::BackgroundTick => "on_background_tick",
            Self::Event => "on_event",
            Self::Render => "render",
            Self::CaptureText => "capture_text",
            Self::TaskCallback => "task_callback",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that stop the scheduler
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A hook failed under [`FaultPolicy::FailFast`]
    #[error("{app} failed in {hook}: {message}")]
    HookFailed {
        /// Faulting application
        app: AppId,
        /// Hook that failed
        hook: Hook,
        /// Error or panic message
        message: String,
    },

    /// The display could not be written
    #[error("Display error: {0}")]
    Display(#[source] DeviceError),

    /// The input device could not be read
    #[error("Input error: {0}")]
    Input(#[source] DeviceError),

    /// A catalog launch failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// No application with this ID is registered
    #[error("Unknown application: {0}")]
    UnknownApp(AppId),

    /// The application was isolated after a fault
    #[error("Application {0} is faulted")]
    AppFaulted(AppId),
}

// =============================================================================
// Frame Report
// =============================================================================

/// What happened during one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Time since the previous frame (zero for the first)
    pub delta: Duration,
    /// Task callbacks invoked
    pub delivered: usize,
    /// Application brought to the foreground by an attention request
    pub switched_to: Option<AppId>,
    /// Whether a frame was presented
    pub rendered: bool,
    /// Background ticks delivered
    pub background_ticks: usize,
}

// =============================================================================
// Scheduler
// =============================================================================

struct AppEntry {
    id: AppId,
    app: Box<dyn Application>,
    flags: AppFlags,
    catalog_id: Option<String>,
    fault: Option<String>,
}

/// Run one hook with a fresh context, catching errors and panics
fn call_hook<R>(
    entry: &mut AppEntry,
    services: &mut Services,
    f: impl FnOnce(&mut dyn Application, &mut Context<'_>) -> HookResult<R>,
) -> Result<R, String> {
    let mut cx = Context::new(entry.id, &mut entry.flags, services);
    let app = entry.app.as_mut();
    match std::panic::catch_unwind(AssertUnwindSafe(|| f(app, &mut cx))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

/// The cooperative application scheduler
pub struct Scheduler {
    config: RuntimeConfig,
    surface: Box<dyn Surface>,
    input: Box<dyn InputSource>,
    apps: Vec<AppEntry>,
    launcher: Option<AppId>,
    catalog: Option<Box<dyn AppCatalog>>,
    services: Services,
    router: ModeRouter,
    pacer: FramePacer,
    background: TickTimer,
    last_frame: Option<Instant>,
    frame: u64,
    overlay_dirty: bool,
}

impl Scheduler {
    /// Create a scheduler drawing to `surface` and reading `input`
    ///
    /// The task bridge uses the executor named in the configuration. A tokio
    /// executor needs to be created inside a runtime; without one the bridge
    /// falls back to OS threads.
    pub fn new(config: RuntimeConfig, surface: Box<dyn Surface>, input: Box<dyn InputSource>) -> Self {
        let executor: Arc<dyn Executor> = match config.tasks.executor {
            ExecutorKind::Tokio => match TokioExecutor::try_current() {
                Some(executor) => Arc::new(executor),
                None => {
                    tracing::warn!("No tokio runtime available, running tasks on threads");
                    Arc::new(ThreadExecutor::new())
                }
            },
            ExecutorKind::Thread => Arc::new(ThreadExecutor::new()),
        };
        let tasks = TaskBridge::new(executor).with_max_in_flight(config.tasks.max_in_flight);

        tracing::info!(
            width = surface.width(),
            height = surface.height(),
            fps = config.scheduler.frame_rate,
            executor = tasks.executor_name(),
            fault_policy = ?config.scheduler.fault_policy,
            "Scheduler created"
        );

        Self {
            pacer: FramePacer::new(config.scheduler.frame_rate),
            background: TickTimer::new(config.scheduler.background_tick),
            config,
            surface,
            input,
            apps: Vec::new(),
            launcher: None,
            catalog: None,
            services: Services::new(tasks),
            router: ModeRouter::new(),
            last_frame: None,
            frame: 0,
            overlay_dirty: false,
        }
    }

    /// Replace the task bridge
    #[must_use]
    pub fn with_task_bridge(mut self, tasks: TaskBridge) -> Self {
        self.services.tasks = tasks;
        self
    }

    /// Use `catalog` for [`launch`](Self::launch)
    #[must_use]
    pub fn with_catalog(mut self, catalog: Box<dyn AppCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Register an application; it starts in the background
    pub fn register(&mut self, app: Box<dyn Application>) -> AppId {
        let id = AppId::next();
        tracing::info!(app = %id, name = app.name(), "Application registered");
        self.apps.push(AppEntry {
            id,
            app,
            flags: AppFlags::default(),
            catalog_id: None,
            fault: None,
        });
        id
    }

    /// Register the application HOME returns to
    pub fn set_launcher(&mut self, app: Box<dyn Application>) -> AppId {
        let id = self.register(app);
        self.launcher = Some(id);
        tracing::info!(app = %id, "Launcher set");
        id
    }

    /// Remove an application and hand it back
    ///
    /// Its pending tasks and attention requests are dropped. If it was
    /// foreground, the scheduler returns home.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not registered, or if a hook fails under
    /// [`FaultPolicy::FailFast`].
    pub fn unregister(&mut self, id: AppId) -> Result<Box<dyn Application>, SchedulerError> {
        self.index_of(id).ok_or(SchedulerError::UnknownApp(id))?;

        let was_active = self.services.active == Some(id);
        if was_active {
            self.services.active = None;
            self.dispatch(id, Hook::Deactivate, |app, cx| app.on_deactivate(cx))?;
        }

        self.services.tasks.retire_owner(id);
        self.services.attention.remove_app(id);
        if self.launcher == Some(id) {
            self.launcher = None;
        }

        let index = self.index_of(id).ok_or(SchedulerError::UnknownApp(id))?;
        let entry = self.apps.remove(index);
        tracing::info!(app = %id, name = entry.app.name(), "Application unregistered");

        if was_active {
            self.return_to_launcher()?;
        }
        Ok(entry.app)
    }

    // =========================================================================
    // Switching
    // =========================================================================

    /// Make `id` the foreground application
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is unknown or faulted, or if a hook fails
    /// under [`FaultPolicy::FailFast`].
    pub fn switch_to(&mut self, id: AppId) -> Result<(), SchedulerError> {
        let index = self.index_of(id).ok_or(SchedulerError::UnknownApp(id))?;
        if self.apps[index].fault.is_some() {
            return Err(SchedulerError::AppFaulted(id));
        }
        if self.services.active == Some(id) {
            return Ok(());
        }

        if let Some(previous) = self.services.active.take() {
            self.dispatch(previous, Hook::Deactivate, |app, cx| app.on_deactivate(cx))?;
        }

        // The deactivate hook may have launched something else
        let Some(index) = self.live_index(id) else {
            return Ok(());
        };

        tracing::info!(app = %id, name = self.apps[index].app.name(), "Switching application");
        self.services.active = Some(id);
        self.services.attention.remove_app(id);
        self.apps[index].flags.dirty = true;
        self.surface.clear();

        let metrics = self.help_metrics();
        self.router.clamp_scroll(metrics);
        // An open overlay now shows the new application's keys
        if self.router.is_help_open() {
            self.overlay_dirty = true;
        }

        self.dispatch(id, Hook::Activate, |app, cx| app.on_activate(cx))?;
        Ok(())
    }

    /// Switch to the launcher, or stop if there is none
    ///
    /// # Errors
    ///
    /// Returns an error if a hook fails under [`FaultPolicy::FailFast`].
    pub fn return_to_launcher(&mut self) -> Result<(), SchedulerError> {
        match self.launcher.filter(|id| self.live_index(*id).is_some()) {
            Some(launcher) => self.switch_to(launcher),
            None => {
                tracing::info!("No launcher available, stopping");
                self.stop();
                Ok(())
            }
        }
    }

    /// Queue an attention request on behalf of `id`
    ///
    /// Returns whether the request was queued. Requests for the active,
    /// unknown or faulted applications are ignored.
    pub fn request_switch(&mut self, id: AppId, priority: Priority) -> bool {
        if self.services.active == Some(id) || self.live_index(id).is_none() {
            tracing::debug!(app = %id, %priority, "Ignoring switch request");
            return false;
        }
        self.services.attention.request(id, priority)
    }

    /// Switch to the catalog application `catalog_id`, starting it if needed
    ///
    /// A running, non-faulted instance is reused.
    ///
    /// # Errors
    ///
    /// Returns an error if no catalog is attached, the ID is unknown, the
    /// application fails to start, or a hook fails under
    /// [`FaultPolicy::FailFast`].
    pub fn launch(&mut self, catalog_id: &str) -> Result<AppId, SchedulerError> {
        let running = self
            .apps
            .iter()
            .find(|e| e.fault.is_none() && e.catalog_id.as_deref() == Some(catalog_id))
            .map(|e| e.id);
        if let Some(id) = running {
            self.switch_to(id)?;
            return Ok(id);
        }

        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| CatalogError::UnknownApp(catalog_id.to_string()))?;
        let app = catalog.instantiate(catalog_id)?;

        let id = self.register(app);
        if let Some(index) = self.index_of(id) {
            self.apps[index].catalog_id = Some(catalog_id.to_string());
        }
        tracing::info!(app = %id, catalog_id, "Application launched");

        self.switch_to(id)?;
        Ok(id)
    }

    // =========================================================================
    // Main Loop
    // =========================================================================

    /// Run until stopped
    ///
    /// Starts on the launcher (or the first registered application) unless
    /// something is already foreground. The task bridge is shut down on the
    /// way out and reopened on the next call, so a stopped scheduler can be
    /// run again.
    ///
    /// # Errors
    ///
    /// Returns an error if a device fails or a hook fails under
    /// [`FaultPolicy::FailFast`].
    pub fn run(&mut self) -> Result<(), SchedulerError> {
        self.services.running = true;
        self.services.tasks.reopen();
        let result = self.run_loop();
        self.services.tasks.shutdown();
        tracing::info!(frames = self.frame, "Scheduler stopped");
        result
    }

    fn run_loop(&mut self) -> Result<(), SchedulerError> {
        if self.services.active.is_none() {
            let first = self
                .launcher
                .or_else(|| self.apps.iter().find(|e| e.fault.is_none()).map(|e| e.id));
            match first {
                Some(id) => self.switch_to(id)?,
                None => {
                    tracing::warn!("No applications registered");
                    self.stop();
                }
            }
        }

        while self.services.running {
            let frame_start = Instant::now();
            self.run_frame(frame_start)?;
            self.pacer.wait(frame_start);
        }
        Ok(())
    }

    /// Run a single frame as of `now`
    ///
    /// Does not sleep. Later steps are skipped once the scheduler stops.
    ///
    /// # Errors
    ///
    /// Returns an error if a device fails or a hook fails under
    /// [`FaultPolicy::FailFast`].
    pub fn run_frame(&mut self, now: Instant) -> Result<FrameReport, SchedulerError> {
        self.frame += 1;
        let delta = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_frame = Some(now);

        let mut report = FrameReport {
            frame: self.frame,
            delta,
            ..FrameReport::default()
        };

        report.delivered = self.deliver_tasks()?;
        if !self.services.running {
            return Ok(report);
        }

        self.process_input()?;
        if !self.services.running {
            return Ok(report);
        }

        report.switched_to = self.resolve_attention()?;
        if !self.services.running {
            return Ok(report);
        }

        self.run_capture()?;
        if !self.services.running {
            return Ok(report);
        }

        if let Some(active) = self.services.active {
            self.dispatch(active, Hook::Update, |app, cx| app.on_update(cx, delta))?;
        }
        if !self.services.running {
            return Ok(report);
        }

        report.rendered = self.render()?;

        if self.config.scheduler.allow_background_apps && self.background.is_due(now) {
            report.background_ticks = self.tick_background()?;
        }

        Ok(report)
    }

    /// Clear the running flag; `run` returns after the current frame
    pub fn stop(&mut self) {
        if self.services.running {
            tracing::info!("Scheduler stop requested");
        }
        self.services.running = false;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Whether the loop is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.services.running
    }

    /// Foreground application
    #[must_use]
    pub fn active(&self) -> Option<AppId> {
        self.services.active
    }

    /// Registered launcher
    #[must_use]
    pub fn launcher(&self) -> Option<AppId> {
        self.launcher
    }

    /// Current input mode
    #[must_use]
    pub fn mode(&self) -> ModeState {
        self.router.state()
    }

    /// Fault message of an isolated application
    #[must_use]
    pub fn fault(&self, id: AppId) -> Option<&str> {
        self.index_of(id).and_then(|i| self.apps[i].fault.as_deref())
    }

    /// Registered application IDs in registration order
    #[must_use]
    pub fn app_ids(&self) -> Vec<AppId> {
        self.apps.iter().map(|e| e.id).collect()
    }

    /// Borrow a registered application as its concrete type
    #[must_use]
    pub fn app<A: Application>(&self, id: AppId) -> Option<&A> {
        self.index_of(id).and_then(|i| downcast_ref::<A>(self.apps[i].app.as_ref()))
    }

    /// Mutably borrow a registered application as its concrete type
    #[must_use]
    pub fn app_mut<A: Application>(&mut self, id: AppId) -> Option<&mut A> {
        let index = self.index_of(id)?;
        downcast_mut::<A>(self.apps[index].app.as_mut())
    }

    /// Task bridge counters
    #[must_use]
    pub fn task_stats(&self) -> TaskStats {
        self.services.tasks.stats()
    }

    /// Tasks awaiting delivery
    #[must_use]
    pub fn tasks_in_flight(&self) -> usize {
        self.services.tasks.in_flight()
    }

    /// Queued attention requests
    #[must_use]
    pub fn pending_attention(&self) -> usize {
        self.services.attention.len()
    }

    // =========================================================================
    // Frame Steps
    // =========================================================================

    fn deliver_tasks(&mut self) -> Result<usize, SchedulerError> {
        let mut delivered = 0;
        for delivery in self.services.tasks.drain_completed() {
            let owner = delivery.owner();
            let Some(index) = self.live_index(owner) else {
                tracing::debug!(app = %owner, task = %delivery.id(), "Dropping result for unavailable app");
                continue;
            };

            let result = call_hook(&mut self.apps[index], &mut self.services, |app, cx| {
                delivery.deliver(app, cx)
            });
            delivered += 1;
            self.settle(owner, Hook::TaskCallback, result)?;
        }
        Ok(delivered)
    }

    fn process_input(&mut self) -> Result<(), SchedulerError> {
        let timeout = self.config.scheduler.input_poll_timeout;
        let Some(event) = self.input.poll(timeout).map_err(SchedulerError::Input)? else {
            return Ok(());
        };

        let metrics = self.help_metrics();
        match self.router.route(&event, metrics) {
            Route::Quit => {
                tracing::info!("Quit key pressed");
                self.stop();
            }
            Route::Redraw => self.overlay_dirty = true,
            Route::Swallowed => {}
            Route::Home => self.return_to_launcher()?,
            Route::Deliver(event) => {
                let Some(active) = self.services.active else {
                    if self.router.bubble(&event, false).is_some() {
                        self.return_to_launcher()?;
                    }
                    return Ok(());
                };

                match self.dispatch(active, Hook::Event, |app, cx| app.on_event(cx, &event))? {
                    Some(true) => {
                        if let Some(index) = self.live_index(active) {
                            self.apps[index].flags.dirty = true;
                        }
                    }
                    Some(false) => {
                        if self.router.bubble(&event, false) == Some(Route::Home) {
                            self.return_to_launcher()?;
                        }
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }

    fn resolve_attention(&mut self) -> Result<Option<AppId>, SchedulerError> {
        while let Some(request) = self.services.attention.pop() {
            if self.services.active == Some(request.app) || self.live_index(request.app).is_none() {
                tracing::debug!(app = %request.app, "Dropping stale attention request");
                continue;
            }
            tracing::info!(app = %request.app, priority = %request.priority, "Serving attention request");
            self.switch_to(request.app)?;
            return Ok(Some(request.app));
        }
        Ok(None)
    }

    fn run_capture(&mut self) -> Result<(), SchedulerError> {
        let Some(active) = self.services.active else {
            return Ok(());
        };
        let Some(index) = self.live_index(active) else {
            return Ok(());
        };
        if !self.apps[index].flags.needs_keyboard || !self.router.begin_capture() {
            return Ok(());
        }

        tracing::info!(app = %active, "Text capture started");
        let result = {
            let Self {
                apps,
                services,
                surface,
                input,
                ..
            } = self;
            call_hook(&mut apps[index], services, |app, cx| {
                app.capture_text(cx, surface.as_mut(), input.as_mut())
            })
        };

        self.router.end_capture();
        self.apps[index].flags.needs_keyboard = false;
        self.apps[index].flags.dirty = true;
        self.surface.clear();

        self.settle(active, Hook::CaptureText, result)?;
        Ok(())
    }

    fn render(&mut self) -> Result<bool, SchedulerError> {
        let active = self
            .services
            .active
            .and_then(|id| self.live_index(id).map(|index| (id, index)));
        let help_open = self.router.is_help_open();
        let app_dirty = active.is_some_and(|(_, index)| self.apps[index].flags.dirty);

        // The overlay hides the application, so only overlay changes count
        let needs_render = self.overlay_dirty || (!help_open && app_dirty);
        if !needs_render {
            return Ok(false);
        }
        self.overlay_dirty = false;
        self.surface.clear();

        if help_open {
            let lines = self.help_lines();
            let metrics = HelpLayout::for_surface(self.surface.as_ref()).metrics(lines.len());
            self.router.clamp_scroll(metrics);
            render_help(self.surface.as_mut(), &lines, self.router.scroll());
        } else if let Some((id, index)) = active {
            self.apps[index].flags.dirty = false;
            let result = {
                let Self {
                    apps,
                    services,
                    surface,
                    ..
                } = self;
                call_hook(&mut apps[index], services, |app, cx| app.render(cx, surface.as_mut()))
            };
            self.settle(id, Hook::Render, result)?;
        }

        self.surface.present().map_err(SchedulerError::Display)?;
        Ok(true)
    }

    fn tick_background(&mut self) -> Result<usize, SchedulerError> {
        let ids: Vec<AppId> = self
            .apps
            .iter()
            .filter(|e| e.fault.is_none())
            .map(|e| e.id)
            .collect();

        let mut ticked = 0;
        for id in ids {
            // Re-checked per app: an earlier tick may have switched
            if self.services.active == Some(id) {
                continue;
            }
            if self
                .dispatch(id, Hook::BackgroundTick, |app, cx| app.on_background_tick(cx))?
                .is_some()
            {
                ticked += 1;
            }
        }

        tracing::trace!(ticked, "Background tick");
        Ok(ticked)
    }

    // =========================================================================
    // Hook Plumbing
    // =========================================================================

    fn index_of(&self, id: AppId) -> Option<usize> {
        self.apps.iter().position(|e| e.id == id)
    }

    fn live_index(&self, id: AppId) -> Option<usize> {
        self.index_of(id).filter(|&i| self.apps[i].fault.is_none())
    }

    fn help_lines(&self) -> Vec<HelpLine> {
        let entries = self
            .services
            .active
            .and_then(|id| self.live_index(id))
            .map(|i| self.apps[i].app.help_entries())
            .unwrap_or_default();
        build_help_lines(&entries)
    }

    fn help_metrics(&self) -> HelpMetrics {
        HelpLayout::for_surface(self.surface.as_ref()).metrics(self.help_lines().len())
    }

    /// Call a hook on a live application and settle the outcome
    ///
    /// Returns `None` if the application is missing, faulted, or faulted now.
    fn dispatch<R>(
        &mut self,
        id: AppId,
        hook: Hook,
        f: impl FnOnce(&mut dyn Application, &mut Context<'_>) -> HookResult<R>,
    ) -> Result<Option<R>, SchedulerError> {
        let Some(index) = self.live_index(id) else {
            return Ok(None);
        };
        let result = call_hook(&mut self.apps[index], &mut self.services, f);
        self.settle(id, hook, result)
    }

    /// Apply a hook's outcome and whatever it asked the scheduler to do
    fn settle<R>(&mut self, id: AppId, hook: Hook, result: Result<R, String>) -> Result<Option<R>, SchedulerError> {
        let value = match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.fault_app(id, hook, message)?;
                None
            }
        };

        while let Some(catalog_id) = self.services.launch_requests.pop_front() {
            match self.launch(&catalog_id) {
                Ok(_) => {}
                Err(SchedulerError::Catalog(e)) => {
                    tracing::warn!(app = %id, catalog_id = %catalog_id, error = %e, "Launch request failed");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(value)
    }

    fn fault_app(&mut self, id: AppId, hook: Hook, message: String) -> Result<(), SchedulerError> {
        tracing::error!(app = %id, hook = %hook, error = %message, "Application hook failed");

        match self.config.scheduler.fault_policy {
            FaultPolicy::FailFast => {
                self.stop();
                Err(SchedulerError::HookFailed { app: id, hook, message })
            }
            FaultPolicy::Isolate => {
                if let Some(index) = self.index_of(id) {
                    let entry = &mut self.apps[index];
                    entry.fault = Some(message);
                    entry.flags = AppFlags::default();
                }
                self.services.tasks.retire_owner(id);
                self.services.attention.remove_app(id);
                tracing::warn!(app = %id, "Application isolated");

                if self.services.active == Some(id) {
                    self.services.active = None;
                    self.router.close_help();
                    self.return_to_launcher()?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{HeadlessInput, Key};
    use crate::surface::HeadlessSurface;
    use crate::tasks::InlineExecutor;

    struct Blank {
        renders: usize,
    }

    impl Application for Blank {
        fn name(&self) -> &str {
            "blank"
        }

        fn render(&mut self, _cx: &mut Context<'_>, _surface: &mut dyn Surface) -> HookResult {
            self.renders += 1;
            Ok(())
        }
    }

    fn scheduler() -> (Scheduler, HeadlessSurface, HeadlessInput) {
        let surface = HeadlessSurface::new(64, 64);
        let input = HeadlessInput::new();
        let mut config = RuntimeConfig::default();
        config.tasks.executor = ExecutorKind::Thread;
        let scheduler = Scheduler::new(config, Box::new(surface.clone()), Box::new(input.clone()))
            .with_task_bridge(TaskBridge::new(Arc::new(InlineExecutor)));
        (scheduler, surface, input)
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(Hook::BackgroundTick.to_string(), "on_background_tick");
        assert_eq!(Hook::Render.as_str(), "render");
    }

    #[test]
    fn test_error_display() {
        let err = SchedulerError::HookFailed {
            app: AppId::from_raw(3),
            hook: Hook::Update,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "app-3 failed in on_update: boom");
    }

    #[test]
    fn test_first_frame_has_zero_delta() {
        let (mut scheduler, _, _) = scheduler();
        let t0 = Instant::now();
        assert_eq!(scheduler.run_frame(t0).unwrap().delta, Duration::ZERO);

        let report = scheduler.run_frame(t0 + Duration::from_millis(16)).unwrap();
        assert_eq!(report.frame, 2);
        assert_eq!(report.delta, Duration::from_millis(16));
    }

    #[test]
    fn test_switch_renders_once() {
        let (mut scheduler, surface, _) = scheduler();
        let id = scheduler.register(Box::new(Blank { renders: 0 }));
        scheduler.switch_to(id).unwrap();

        let t0 = Instant::now();
        assert!(scheduler.run_frame(t0).unwrap().rendered);
        assert!(!scheduler.run_frame(t0 + Duration::from_millis(16)).unwrap().rendered);
        assert_eq!(scheduler.app::<Blank>(id).unwrap().renders, 1);
        assert_eq!(surface.present_count(), 1);
    }

    #[test]
    fn test_unknown_switch() {
        let (mut scheduler, _, _) = scheduler();
        let missing = AppId::from_raw(u64::MAX);
        assert!(matches!(
            scheduler.switch_to(missing),
            Err(SchedulerError::UnknownApp(id)) if id == missing
        ));
        assert!(!scheduler.request_switch(missing, Priority::High));
    }

    #[test]
    fn test_help_overlay_hides_app() {
        let (mut scheduler, surface, input) = scheduler();
        let id = scheduler.register(Box::new(Blank { renders: 0 }));
        scheduler.switch_to(id).unwrap();
        let t0 = Instant::now();
        scheduler.run_frame(t0).unwrap();

        input.push(Key::Help);
        let report = scheduler.run_frame(t0 + Duration::from_millis(16)).unwrap();
        assert!(report.rendered);
        assert!(surface.contains_text("HELP"));
        assert_eq!(scheduler.app::<Blank>(id).unwrap().renders, 1);

        input.push(Key::Back);
        scheduler.run_frame(t0 + Duration::from_millis(32)).unwrap();
        assert_eq!(scheduler.mode(), ModeState::Normal);
        assert_eq!(scheduler.app::<Blank>(id).unwrap().renders, 2);
    }

    #[test]
    fn test_run_without_apps_returns() {
        let (mut scheduler, _, _) = scheduler();
        scheduler.run().unwrap();
        assert!(!scheduler.is_running());
    }
}
