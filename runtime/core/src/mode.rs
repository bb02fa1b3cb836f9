//! Input/Mode Router
//!
//! Decides who sees an input event: the active application, the help
//! overlay, or nobody. The router owns the scheduler-wide [`ModeState`].
//!
//! # State Machine
//!
//! ```text
//!                 HELP                         app asks for text input
//!   ┌────────┐ ─────────► ┌──────────────┐       ┌─────────────────┐
//!   │ Normal │            │ HelpOverlay  │       │ KeyboardCapture │
//!   └────────┘ ◄───────── └──────────────┘       └─────────────────┘
//!     ▲   │     HELP/BACK   UP/DOWN scroll              │
//!     │   └──────────── begin_capture() ────────────────┘
//!     └──────────────── end_capture() ◄─────────────────┘
//! ```
//!
//! QUIT is honoured in every state. HOME is only meaningful in `Normal`;
//! the overlay swallows everything it does not use.

use crate::input::{InputEvent, Key};

/// Scheduler-wide input mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModeState {
    /// Events go to the active application
    #[default]
    Normal,
    /// The help overlay owns input
    HelpOverlay {
        /// Index of the first visible help line
        scroll: usize,
    },
    /// A blocking text-entry capture owns input
    KeyboardCapture,
}

/// Size of the help content, needed to clamp scrolling
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HelpMetrics {
    /// Total number of help lines
    pub item_count: usize,
    /// Lines that fit on screen at once
    pub visible_lines: usize,
}

impl HelpMetrics {
    /// Largest valid scroll offset
    #[must_use]
    pub fn max_scroll(&self) -> usize {
        self.item_count.saturating_sub(self.visible_lines)
    }
}

/// What the scheduler should do with an event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Stop the runtime
    Quit,
    /// The overlay changed; redraw the frame
    Redraw,
    /// Consumed with no visible effect
    Swallowed,
    /// Switch to the launcher (or stop when there is none)
    Home,
    /// Hand the event to the active application
    Deliver(InputEvent),
}

/// Routes input according to the current [`ModeState`]
#[derive(Debug, Default)]
pub struct ModeRouter {
    state: ModeState,
}

impl ModeRouter {
    /// Create a router in `Normal` mode
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    #[must_use]
    pub fn state(&self) -> ModeState {
        self.state
    }

    /// Whether the help overlay is showing
    #[must_use]
    pub fn is_help_open(&self) -> bool {
        matches!(self.state, ModeState::HelpOverlay { .. })
    }

    /// Current help scroll offset (0 when the overlay is closed)
    #[must_use]
    pub fn scroll(&self) -> usize {
        match self.state {
            ModeState::HelpOverlay { scroll } => scroll,
            _ => 0,
        }
    }

    /// Decide what happens to `event`
    pub fn route(&mut self, event: &InputEvent, help: HelpMetrics) -> Route {
        if event.key == Key::Quit {
            return Route::Quit;
        }

        match self.state {
            ModeState::Normal => match event.key {
                Key::Help => {
                    self.state = ModeState::HelpOverlay { scroll: 0 };
                    tracing::debug!("Help overlay opened");
                    Route::Redraw
                }
                Key::Home => Route::Home,
                _ => Route::Deliver(*event),
            },
            ModeState::HelpOverlay { scroll } => match event.key {
                Key::Help | Key::Back => {
                    self.close_help();
                    Route::Redraw
                }
                Key::Up => self.set_scroll(scroll, scroll.saturating_sub(1)),
                Key::Down => self.set_scroll(scroll, (scroll + 1).min(help.max_scroll())),
                _ => Route::Swallowed,
            },
            ModeState::KeyboardCapture => Route::Swallowed,
        }
    }

    fn set_scroll(&mut self, old: usize, new: usize) -> Route {
        if old == new {
            return Route::Swallowed;
        }
        self.state = ModeState::HelpOverlay { scroll: new };
        Route::Redraw
    }

    /// Bubble-up for events the application did not consume
    ///
    /// An unhandled BACK goes home; anything else stops here.
    #[must_use]
    pub fn bubble(&self, event: &InputEvent, handled: bool) -> Option<Route> {
        (!handled && event.key == Key::Back).then_some(Route::Home)
    }

    /// Close the help overlay, resetting its scroll offset
    pub fn close_help(&mut self) {
        if self.is_help_open() {
            self.state = ModeState::Normal;
            tracing::debug!("Help overlay closed");
        }
    }

    /// Keep the scroll offset valid after the help content changed
    pub fn clamp_scroll(&mut self, help: HelpMetrics) {
        if let ModeState::HelpOverlay { scroll } = self.state {
            self.state = ModeState::HelpOverlay {
                scroll: scroll.min(help.max_scroll()),
            };
        }
    }

    /// Enter `KeyboardCapture`
    ///
    /// Only possible from `Normal`; returns whether the capture may start.
    pub fn begin_capture(&mut self) -> bool {
        if self.state != ModeState::Normal {
            return false;
        }
        self.state = ModeState::KeyboardCapture;
        tracing::debug!("Keyboard capture started");
        true
    }

    /// Leave `KeyboardCapture` and return to `Normal`
    pub fn end_capture(&mut self) {
        if self.state == ModeState::KeyboardCapture {
            self.state = ModeState::Normal;
            tracing::debug!("Keyboard capture finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELP: HelpMetrics = HelpMetrics {
        item_count: 10,
        visible_lines: 4,
    };

    fn press(router: &mut ModeRouter, key: Key) -> Route {
        router.route(&InputEvent::key(key), HELP)
    }

    #[test]
    fn test_normal_mode_delivers() {
        let mut router = ModeRouter::new();
        assert_eq!(
            press(&mut router, Key::Ok),
            Route::Deliver(InputEvent::key(Key::Ok))
        );
        assert_eq!(
            press(&mut router, Key::Back),
            Route::Deliver(InputEvent::key(Key::Back))
        );
        assert_eq!(router.state(), ModeState::Normal);
    }

    #[test]
    fn test_global_keys() {
        let mut router = ModeRouter::new();
        assert_eq!(press(&mut router, Key::Home), Route::Home);
        assert_eq!(press(&mut router, Key::Quit), Route::Quit);

        press(&mut router, Key::Help);
        assert_eq!(press(&mut router, Key::Quit), Route::Quit);
        assert_eq!(press(&mut router, Key::Home), Route::Swallowed);
    }

    #[test]
    fn test_help_toggle_is_idempotent() {
        let mut router = ModeRouter::new();
        assert_eq!(press(&mut router, Key::Help), Route::Redraw);
        assert!(router.is_help_open());

        press(&mut router, Key::Down);
        press(&mut router, Key::Down);
        assert_eq!(router.scroll(), 2);

        assert_eq!(press(&mut router, Key::Help), Route::Redraw);
        assert_eq!(router.state(), ModeState::Normal);

        press(&mut router, Key::Help);
        assert_eq!(router.state(), ModeState::HelpOverlay { scroll: 0 });
    }

    #[test]
    fn test_back_closes_help() {
        let mut router = ModeRouter::new();
        press(&mut router, Key::Help);
        press(&mut router, Key::Down);
        assert_eq!(press(&mut router, Key::Back), Route::Redraw);
        assert_eq!(router.state(), ModeState::Normal);
        assert_eq!(router.scroll(), 0);
    }

    #[test]
    fn test_scroll_clamps_at_both_ends() {
        let mut router = ModeRouter::new();
        press(&mut router, Key::Help);

        assert_eq!(press(&mut router, Key::Up), Route::Swallowed);
        assert_eq!(router.scroll(), 0);

        for _ in 0..20 {
            press(&mut router, Key::Down);
        }
        assert_eq!(router.scroll(), HELP.max_scroll());
        assert_eq!(press(&mut router, Key::Down), Route::Swallowed);
    }

    #[test]
    fn test_short_help_never_scrolls() {
        let mut router = ModeRouter::new();
        let short = HelpMetrics {
            item_count: 3,
            visible_lines: 6,
        };
        router.route(&InputEvent::key(Key::Help), short);
        router.route(&InputEvent::key(Key::Down), short);
        assert_eq!(router.scroll(), 0);
    }

    #[test]
    fn test_overlay_swallows_app_keys() {
        let mut router = ModeRouter::new();
        press(&mut router, Key::Help);
        assert_eq!(press(&mut router, Key::Ok), Route::Swallowed);
        assert_eq!(press(&mut router, Key::Char('a')), Route::Swallowed);
    }

    #[test]
    fn test_bubble_back() {
        let router = ModeRouter::new();
        let back = InputEvent::key(Key::Back);
        assert_eq!(router.bubble(&back, false), Some(Route::Home));
        assert_eq!(router.bubble(&back, true), None);
        assert_eq!(router.bubble(&InputEvent::key(Key::Ok), false), None);
    }

    #[test]
    fn test_clamp_scroll_after_content_shrinks() {
        let mut router = ModeRouter::new();
        press(&mut router, Key::Help);
        for _ in 0..6 {
            press(&mut router, Key::Down);
        }
        router.clamp_scroll(HelpMetrics {
            item_count: 5,
            visible_lines: 4,
        });
        assert_eq!(router.scroll(), 1);
    }

    #[test]
    fn test_capture_only_from_normal() {
        let mut router = ModeRouter::new();
        press(&mut router, Key::Help);
        assert!(!router.begin_capture());

        press(&mut router, Key::Help);
        assert!(router.begin_capture());
        assert_eq!(router.state(), ModeState::KeyboardCapture);
        assert_eq!(press(&mut router, Key::Ok), Route::Swallowed);

        router.end_capture();
        assert_eq!(router.state(), ModeState::Normal);
    }
}
