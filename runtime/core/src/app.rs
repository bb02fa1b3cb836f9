//! Application Contract
//!
//! Every program hosted by the runtime implements [`Application`]. The
//! scheduler owns each application for the lifetime of the process and drives
//! it exclusively through the lifecycle hooks below; it never branches on the
//! concrete type.
//!
//! # Lifecycle
//!
//! ```text
//!   register ──► background ──on_activate──► foreground ──on_deactivate──► background
//!                    │                          │
//!           on_background_tick (~1 Hz)   on_event / on_update / render
//! ```
//!
//! # Talking Back to the Scheduler
//!
//! Hooks receive a [`Context`]. Apart from hook return values, the context
//! is the only way an application influences the scheduler: marking itself
//! dirty, asking for blocking text input, requesting attention, submitting
//! background tasks, launching another application or quitting.
//!
//! Hooks return [`HookResult`]. An `Err` (or a panic) marks the application
//! as faulted; see [`crate::FaultPolicy`].

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::context::Context;
use crate::input::{InputEvent, InputSource};
use crate::surface::Surface;

/// Result type returned by application hooks and task callbacks
pub type HookResult<T = ()> = anyhow::Result<T>;

/// Unique identifier for a registered application
///
/// Assigned by the scheduler on registration and stable for the life of the
/// process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppId(u64);

impl AppId {
    /// Allocate a new unique application ID
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Create an application ID from a raw value (for testing)
    #[cfg(test)]
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw numeric value
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app-{}", self.0)
    }
}

/// One row of an application's help screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpEntry {
    /// Key label, e.g. "OK" or "UP"
    pub key: String,
    /// What the key does
    pub description: String,
}

impl HelpEntry {
    /// Create a help entry
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
        }
    }
}

/// Scheduler-visible flags of one application
///
/// These are the only mutable state the scheduler reads from an application.
/// They are owned by the scheduler and reached through [`Context`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppFlags {
    /// The application needs to be rendered this frame
    pub dirty: bool,
    /// The application wants a blocking text-entry capture
    pub needs_keyboard: bool,
}

/// Downcasting support for applications
///
/// Implemented for every `'static` type so typed task callbacks and tests can
/// reach the concrete application behind a `dyn Application`.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A hosted program
///
/// Only [`name`](Self::name) and [`render`](Self::render) are required; every
/// other hook defaults to doing nothing.
pub trait Application: AsAny {
    /// Display name
    fn name(&self) -> &str;

    /// App-specific rows for the help overlay
    fn help_entries(&self) -> Vec<HelpEntry> {
        Vec::new()
    }

    /// Called when the application becomes foreground
    ///
    /// The scheduler marks the application dirty before calling this, so the
    /// first foreground frame is always rendered.
    fn on_activate(&mut self, cx: &mut Context<'_>) -> HookResult {
        let _ = cx;
        Ok(())
    }

    /// Called when the application stops being foreground. Must not block.
    fn on_deactivate(&mut self, cx: &mut Context<'_>) -> HookResult {
        let _ = cx;
        Ok(())
    }

    /// Called once per frame while foreground, before render
    ///
    /// `delta` is wall-clock time since the previous frame. Runs on the shared
    /// frame budget, so it must not block.
    fn on_update(&mut self, cx: &mut Context<'_>, delta: Duration) -> HookResult {
        let _ = (cx, delta);
        Ok(())
    }

    /// Called roughly once per second while not foreground
    ///
    /// All background applications are ticked sequentially in one frame slot,
    /// so this must be cheap.
    fn on_background_tick(&mut self, cx: &mut Context<'_>) -> HookResult {
        let _ = cx;
        Ok(())
    }

    /// Handle an input event while foreground
    ///
    /// Returns whether the event was consumed. An unconsumed BACK returns the
    /// user to the launcher. A consumed event marks the application dirty.
    fn on_event(&mut self, cx: &mut Context<'_>, event: &InputEvent) -> HookResult<bool> {
        let _ = (cx, event);
        Ok(false)
    }

    /// Draw the application
    ///
    /// Called after `on_update` only when the application is dirty. The
    /// surface has already been cleared and the dirty flag reset, so calling
    /// [`Context::mark_dirty`] here asks for another frame.
    fn render(&mut self, cx: &mut Context<'_>, surface: &mut dyn Surface) -> HookResult;

    /// Blocking text entry
    ///
    /// Called after the application asked for it with
    /// [`Context::request_text_input`]. This is the one hook allowed to block
    /// the frame loop, and it gets direct surface and input access for that
    /// purpose (typically to run [`crate::keyboard::show_keyboard`]).
    fn capture_text(
        &mut self,
        cx: &mut Context<'_>,
        surface: &mut dyn Surface,
        input: &mut dyn InputSource,
    ) -> HookResult {
        let _ = (cx, surface, input);
        Ok(())
    }
}

/// Downcast a `dyn Application` to its concrete type
pub fn downcast_mut<A: Application>(app: &mut dyn Application) -> Option<&mut A> {
    app.as_any_mut().downcast_mut::<A>()
}

/// Downcast a `dyn Application` reference to its concrete type
pub fn downcast_ref<A: Application>(app: &dyn Application) -> Option<&A> {
    app.as_any().downcast_ref::<A>()
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    impl Application for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn render(&mut self, _cx: &mut Context<'_>, _surface: &mut dyn Surface) -> HookResult {
            Ok(())
        }
    }

    #[test]
    fn test_app_ids_are_unique() {
        let a = AppId::next();
        let b = AppId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_app_id_display() {
        assert_eq!(AppId::from_raw(7).to_string(), "app-7");
    }

    #[test]
    fn test_downcast() {
        let mut boxed: Box<dyn Application> = Box::new(Probe);
        assert!(downcast_mut::<Probe>(boxed.as_mut()).is_some());
        assert!(downcast_ref::<Probe>(boxed.as_ref()).is_some());
        assert_eq!(boxed.name(), "probe");
        assert!(boxed.help_entries().is_empty());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(panic_message(payload.as_ref()), "owned boom");

        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
