//! Input Source Abstraction
//!
//! Devices report logical keys, not scan codes. The terminal host maps
//! crossterm events onto [`Key`]; an LED panel build would map GPIO buttons.
//! The scheduler polls at most one [`InputEvent`] per frame.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::surface::DeviceError;

/// Logical key identifiers understood by the runtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// Navigate up
    Up,
    /// Navigate down
    Down,
    /// Navigate left
    Left,
    /// Navigate right
    Right,
    /// Confirm / select
    Ok,
    /// Go back one level (bubbles to the launcher when unhandled)
    Back,
    /// Return to the launcher
    Home,
    /// Toggle the help overlay
    Help,
    /// Stop the runtime
    Quit,
    /// Any other printable character
    Char(char),
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Left => write!(f, "LEFT"),
            Self::Right => write!(f, "RIGHT"),
            Self::Ok => write!(f, "OK"),
            Self::Back => write!(f, "BACK"),
            Self::Home => write!(f, "HOME"),
            Self::Help => write!(f, "HELP"),
            Self::Quit => write!(f, "QUIT"),
            Self::Char(c) => write!(f, "'{c}'"),
        }
    }
}

/// A single input event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputEvent {
    /// Logical key
    pub key: Key,
    /// The printable character that produced the key, if any
    ///
    /// A keyboard `q` maps to [`Key::Quit`] but still carries `'q'` here so
    /// text entry can type it.
    pub raw: Option<char>,
}

impl InputEvent {
    /// Event for a logical key with no printable character
    #[must_use]
    pub fn key(key: Key) -> Self {
        let raw = match key {
            Key::Char(c) => Some(c),
            _ => None,
        };
        Self { key, raw }
    }

    /// Event for a key that also carries a printable character
    #[must_use]
    pub fn with_raw(key: Key, raw: char) -> Self {
        Self {
            key,
            raw: Some(raw),
        }
    }

    /// Printable character carried by this event
    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        self.raw
    }
}

impl From<Key> for InputEvent {
    fn from(key: Key) -> Self {
        Self::key(key)
    }
}

/// A source of input events
pub trait InputSource {
    /// Wait up to `timeout` for the next event
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be read.
    fn poll(&mut self, timeout: Duration) -> Result<Option<InputEvent>, DeviceError>;
}

/// Scripted input source for tests and headless runs
///
/// Cloning produces another handle to the same queue, so a test can keep
/// pushing events after handing the source to the scheduler. Polling never
/// waits; an empty queue returns `None` immediately.
#[derive(Clone, Debug, Default)]
pub struct HeadlessInput {
    queue: Arc<Mutex<VecDeque<InputEvent>>>,
}

impl HeadlessInput {
    /// Create an empty input queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event
    pub fn push(&self, event: impl Into<InputEvent>) {
        self.queue.lock().push_back(event.into());
    }

    /// Queue several events in order
    pub fn push_all(&self, events: impl IntoIterator<Item = InputEvent>) {
        self.queue.lock().extend(events);
    }

    /// Queue one [`Key::Char`] event per character of `text`
    pub fn type_text(&self, text: &str) {
        self.push_all(text.chars().map(|c| InputEvent::key(Key::Char(c))));
    }

    /// Events not yet consumed
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

impl InputSource for HeadlessInput {
    fn poll(&mut self, _timeout: Duration) -> Result<Option<InputEvent>, DeviceError> {
        Ok(self.queue.lock().pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_input_is_fifo() {
        let mut input = HeadlessInput::new();
        input.push(Key::Up);
        input.push(Key::Ok);

        let timeout = Duration::from_millis(1);
        assert_eq!(input.poll(timeout).unwrap().map(|e| e.key), Some(Key::Up));
        assert_eq!(input.poll(timeout).unwrap().map(|e| e.key), Some(Key::Ok));
        assert_eq!(input.poll(timeout).unwrap(), None);
    }

    #[test]
    fn test_char_event_carries_raw() {
        let event = InputEvent::key(Key::Char('x'));
        assert_eq!(event.as_char(), Some('x'));
        assert_eq!(InputEvent::key(Key::Ok).as_char(), None);
        assert_eq!(InputEvent::with_raw(Key::Quit, 'q').as_char(), Some('q'));
    }

    #[test]
    fn test_type_text() {
        let input = HeadlessInput::new();
        input.type_text("ab");
        assert_eq!(input.pending(), 2);
    }
}
