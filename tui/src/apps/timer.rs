//! Countdown Timer
//!
//! Pick a preset, start it, and leave: the countdown keeps running from the
//! background tick and takes over the screen with high priority when it
//! reaches zero.
//!
//! # States
//!
//! ```text
//!   Setting ──OK──► Running ◄──SPC──► Paused
//!      ▲               │ reaches 0       │
//!      │ any key       ▼                 │ C
//!      └────────── Alarm        Setting ◄┘
//! ```

use std::time::Duration;

use matrixos_core::{
    draw_centered_text, Application, Context, HelpEntry, HookResult, InputEvent, Key, Priority, Surface,
};

use crate::draw::{self, to_i32};
use crate::theme;

/// Preset durations in seconds
pub const PRESETS: [u64; 5] = [5, 10, 15, 30, 60];

/// Preset selected on start (10 seconds)
const DEFAULT_PRESET: usize = 1;

/// Countdown consumed by one background tick
const BACKGROUND_STEP: Duration = Duration::from_secs(1);

/// Alarm flashes per second
const FLASH_RATE: f32 = 3.0;

/// Where the timer is in its cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// Choosing a preset
    Setting,
    /// Counting down
    Running,
    /// Countdown held
    Paused,
    /// Reached zero, waiting for a key
    Alarm,
}

/// What the last render showed, so updates only redraw on visible change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Shown {
    seconds: u64,
    bar: u32,
    flash: bool,
}

/// Countdown timer application
pub struct TimerApp {
    state: TimerState,
    selected: usize,
    total: Duration,
    remaining: Duration,
    alarm_elapsed: Duration,
    /// The alarm has been on screen at least once
    alarm_seen: bool,
    shown: Option<Shown>,
    /// Progress bar width at the last render
    bar_width: u32,
}

impl Default for TimerApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerApp {
    /// Timer in setting mode with the default preset
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: TimerState::Setting,
            selected: DEFAULT_PRESET,
            total: Duration::ZERO,
            remaining: Duration::ZERO,
            alarm_elapsed: Duration::ZERO,
            alarm_seen: false,
            shown: None,
            bar_width: 0,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Selected preset in seconds
    #[must_use]
    pub fn selected_seconds(&self) -> u64 {
        PRESETS[self.selected]
    }

    /// Time left on the countdown
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Fraction of the countdown still left, 0.0..=1.0
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.total.is_zero() {
            return 0.0;
        }
        self.remaining.as_secs_f32() / self.total.as_secs_f32()
    }

    fn start(&mut self) {
        self.total = Duration::from_secs(self.selected_seconds());
        self.remaining = self.total;
        self.state = TimerState::Running;
        tracing::info!(seconds = self.total.as_secs(), "Timer started");
    }

    fn reset(&mut self) {
        self.state = TimerState::Setting;
        self.remaining = Duration::ZERO;
        self.alarm_seen = false;
    }

    /// Consume `step` of countdown; returns whether the alarm went off
    fn count_down(&mut self, step: Duration) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(step);
        if !self.remaining.is_zero() {
            return false;
        }
        self.state = TimerState::Alarm;
        self.alarm_elapsed = Duration::ZERO;
        self.alarm_seen = false;
        tracing::info!("Timer finished");
        true
    }

    fn flash_on(&self) -> bool {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let phase = (self.alarm_elapsed.as_secs_f32() * FLASH_RATE) as u64;
        phase % 2 == 0
    }

    fn visible_state(&self, bar_width: u32) -> Shown {
        Shown {
            seconds: self.remaining.as_secs(),
            bar: draw::progress_width(bar_width, self.progress()),
            flash: self.state == TimerState::Alarm && self.flash_on(),
        }
    }

    fn render_alarm(&self, surface: &mut dyn Surface) {
        let mid = to_i32(surface.height() / 2);
        let bottom = to_i32(surface.height()) - 12;
        if self.flash_on() {
            surface.fill(0, 0, surface.width(), surface.height(), theme::ALARM_BRIGHT);
            draw_centered_text(surface, mid - 8, "TIME'S", theme::TEXT_WHITE);
            draw_centered_text(surface, mid + 2, "UP!", theme::TEXT_WHITE);
            draw_centered_text(surface, bottom, "PRESS ANY KEY", theme::SELECT_YELLOW);
        } else {
            surface.fill(0, 0, surface.width(), surface.height(), theme::ALARM_DIM);
            draw_centered_text(surface, mid - 8, "TIME'S", theme::ALARM_TEXT_DIM);
            draw_centered_text(surface, mid + 2, "UP!", theme::ALARM_TEXT_DIM);
        }
    }

    fn render_setting(&self, surface: &mut dyn Surface) {
        surface.draw_text(2, 2, "TIMER", theme::TITLE_CYAN);
        let items: Vec<String> = PRESETS.iter().map(|p| format!("{p}s")).collect();
        draw::menu_list(surface, &items, self.selected, 16);
        let y = to_i32(surface.height()) - 8;
        draw_centered_text(surface, y, "ENTER=START", theme::HINT_GRAY);
    }

    fn render_countdown(&self, surface: &mut dyn Surface) {
        let width = surface.width();
        let height = to_i32(surface.height());
        let running = self.state == TimerState::Running;

        surface.draw_text(2, 2, "TIMER", theme::TITLE_CYAN);

        let bar_y = if width < 100 { 20 } else { 30 };
        let bar_color = if running { theme::RUN_GREEN } else { theme::PAUSE_ORANGE };
        draw::progress_bar(surface, 4, bar_y, width.saturating_sub(8), 10, self.progress(), bar_color);

        draw_centered_text(surface, height / 2 + 8, &format!("{}s", self.remaining.as_secs()), theme::TEXT_WHITE);

        let status_y = if width < 100 { height - 16 } else { height - 20 };
        if running {
            draw_centered_text(surface, status_y, "RUNNING", theme::RUN_GREEN);
            draw_centered_text(surface, height - 8, "SPC=PAUSE C=STOP", theme::HINT_GRAY);
        } else {
            draw_centered_text(surface, status_y, "PAUSED", theme::PAUSE_ORANGE);
            draw_centered_text(surface, height - 8, "SPC=RESUME C=STOP", theme::HINT_GRAY);
        }
    }
}

/// OK and space both start and pause
fn is_confirm(key: Key) -> bool {
    matches!(key, Key::Ok | Key::Char(' '))
}

impl Application for TimerApp {
    fn name(&self) -> &str {
        "Timer"
    }

    fn help_entries(&self) -> Vec<HelpEntry> {
        match self.state {
            TimerState::Setting => vec![HelpEntry::new("↑↓", "Select time"), HelpEntry::new("ENTER", "Start")],
            TimerState::Alarm => vec![HelpEntry::new("ANY", "Dismiss")],
            TimerState::Running | TimerState::Paused => {
                vec![HelpEntry::new("SPC", "Pause"), HelpEntry::new("C", "Cancel")]
            }
        }
    }

    fn on_activate(&mut self, _cx: &mut Context<'_>) -> HookResult {
        // Stale alarm: already shown, then left without a dismiss
        if self.state == TimerState::Alarm && self.alarm_seen {
            self.reset();
        }
        self.shown = None;
        Ok(())
    }

    fn on_update(&mut self, cx: &mut Context<'_>, delta: Duration) -> HookResult {
        match self.state {
            TimerState::Running => {
                if self.count_down(delta) {
                    cx.mark_dirty();
                    return Ok(());
                }
            }
            TimerState::Alarm => self.alarm_elapsed += delta,
            TimerState::Setting | TimerState::Paused => return Ok(()),
        }

        if self.shown != Some(self.visible_state(self.bar_width)) {
            cx.mark_dirty();
        }
        Ok(())
    }

    fn on_background_tick(&mut self, cx: &mut Context<'_>) -> HookResult {
        if self.count_down(BACKGROUND_STEP) {
            cx.request_attention(Priority::High);
        }
        Ok(())
    }

    fn on_event(&mut self, _cx: &mut Context<'_>, event: &InputEvent) -> HookResult<bool> {
        let key = event.key;
        let handled = match self.state {
            TimerState::Alarm => {
                self.reset();
                true
            }
            TimerState::Setting => match key {
                Key::Up => {
                    self.selected = (self.selected + PRESETS.len() - 1) % PRESETS.len();
                    true
                }
                Key::Down => {
                    self.selected = (self.selected + 1) % PRESETS.len();
                    true
                }
                k if is_confirm(k) => {
                    self.start();
                    true
                }
                _ => false,
            },
            TimerState::Running | TimerState::Paused => match key {
                k if is_confirm(k) => {
                    self.state = if self.state == TimerState::Running {
                        TimerState::Paused
                    } else {
                        TimerState::Running
                    };
                    true
                }
                Key::Char('c' | 'C') => {
                    tracing::info!("Timer cancelled");
                    self.reset();
                    true
                }
                _ => false,
            },
        };
        Ok(handled)
    }

    fn render(&mut self, _cx: &mut Context<'_>, surface: &mut dyn Surface) -> HookResult {
        match self.state {
            TimerState::Alarm => {
                self.alarm_seen = true;
                self.render_alarm(surface);
            }
            TimerState::Setting => self.render_setting(surface),
            TimerState::Running | TimerState::Paused => self.render_countdown(surface),
        }
        self.bar_width = surface.width().saturating_sub(8);
        self.shown = Some(self.visible_state(self.bar_width));
        Ok(())
    }
}
