//! Terminal Input Source
//!
//! Maps crossterm key events onto the runtime's logical keys.
//!
//! | Terminal key      | Logical key |
//! |-------------------|-------------|
//! | Arrows            | UP / DOWN / LEFT / RIGHT |
//! | Enter             | OK          |
//! | Backspace         | BACK        |
//! | Esc               | HOME        |
//! | Tab               | HELP        |
//! | `q`, Ctrl-C       | QUIT        |
//! | other characters  | the character itself |
//!
//! A plain `q` keeps its character so text entry can still type it.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use matrixos_core::{DeviceError, InputEvent, InputSource, Key};

/// Input source reading the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalInput;

impl TerminalInput {
    /// Create a terminal input source
    ///
    /// The terminal must already be in raw mode for single key presses to
    /// arrive.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl InputSource for TerminalInput {
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>, DeviceError> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(key) => map_key_event(key),
            _ => None,
        })
    }
}

/// Map one crossterm key event, ignoring releases and repeats
#[must_use]
pub fn map_key_event(key: KeyEvent) -> Option<InputEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let event = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputEvent::key(Key::Quit),
        KeyCode::Char('q') => InputEvent::with_raw(Key::Quit, 'q'),
        KeyCode::Char(c) => InputEvent::key(Key::Char(c)),
        KeyCode::Up => InputEvent::key(Key::Up),
        KeyCode::Down => InputEvent::key(Key::Down),
        KeyCode::Left => InputEvent::key(Key::Left),
        KeyCode::Right => InputEvent::key(Key::Right),
        KeyCode::Enter => InputEvent::key(Key::Ok),
        KeyCode::Backspace => InputEvent::key(Key::Back),
        KeyCode::Esc => InputEvent::key(Key::Home),
        KeyCode::Tab => InputEvent::key(Key::Help),
        _ => return None,
    };
    Some(event)
}
