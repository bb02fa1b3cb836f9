//! On-Screen Keyboard
//!
//! Text entry for devices that only have arrow keys and a select button.
//! Applications call [`show_keyboard`] from their
//! [`capture_text`](crate::Application::capture_text) hook; it takes over the
//! display until the user confirms or cancels.
//!
//! # Controls
//!
//! | Input        | Effect                                  |
//! |--------------|-----------------------------------------|
//! | Arrows       | Move the selection (wraps around)       |
//! | OK           | Press the selected key                  |
//! | BACK / HOME  | Cancel                                  |
//! | Printable    | Typed directly (hardware keyboards)     |
//!
//! Special keys: `✓` done, `←` backspace, `↑` shift, `_` numbers/symbols.

use std::time::Duration;

use crate::input::{InputSource, Key};
use crate::surface::{Color, DeviceError, Surface};

/// Poll interval while waiting for keyboard input
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const DONE: char = '✓';
const BACKSPACE: char = '←';
const SHIFT: char = '↑';
const SYMBOLS: char = '_';

const LOWER: &[&[char]] = &[
    &['q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p'],
    &['a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l'],
    &[SHIFT, 'z', 'x', 'c', 'v', 'b', 'n', 'm', BACKSPACE],
    &[SYMBOLS, ' ', ',', '.', DONE],
];

const UPPER: &[&[char]] = &[
    &['Q', 'W', 'E', 'R', 'T', 'Y', 'U', 'I', 'O', 'P'],
    &['A', 'S', 'D', 'F', 'G', 'H', 'J', 'K', 'L'],
    &[SHIFT, 'Z', 'X', 'C', 'V', 'B', 'N', 'M', BACKSPACE],
    &[SYMBOLS, ' ', ',', '.', DONE],
];

const NUMBERS: &[&[char]] = &[
    &['1', '2', '3', '4', '5', '6', '7', '8', '9', '0'],
    &['!', '@', '#', '$', '%', '^', '&', '*', '(', ')'],
    &[SHIFT, '-', '=', '[', ']', '{', '}', '/', BACKSPACE],
    &[SYMBOLS, ' ', ',', '.', DONE],
];

/// Active key layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyboardMode {
    /// Lowercase letters
    #[default]
    Lower,
    /// Uppercase letters
    Upper,
    /// Digits and symbols
    Numbers,
}

impl KeyboardMode {
    fn layout(self) -> &'static [&'static [char]] {
        match self {
            Self::Lower => LOWER,
            Self::Upper => UPPER,
            Self::Numbers => NUMBERS,
        }
    }
}

/// Where the keyboard is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyboardStatus {
    /// Still taking input
    Editing,
    /// The user confirmed
    Done,
    /// The user backed out
    Cancelled,
}

/// State of an on-screen keyboard session
#[derive(Clone, Debug)]
pub struct OnScreenKeyboard {
    prompt: String,
    text: String,
    mode: KeyboardMode,
    row: usize,
    col: usize,
    status: KeyboardStatus,
}

impl OnScreenKeyboard {
    /// Start a session with a prompt and pre-filled text
    pub fn new(prompt: impl Into<String>, initial: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            text: initial.into(),
            mode: KeyboardMode::Lower,
            row: 0,
            col: 0,
            status: KeyboardStatus::Editing,
        }
    }

    /// Text entered so far
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current layout
    #[must_use]
    pub fn mode(&self) -> KeyboardMode {
        self.mode
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> KeyboardStatus {
        self.status
    }

    /// Key under the selection
    #[must_use]
    pub fn selected(&self) -> char {
        self.layout()[self.row][self.col]
    }

    /// Selected (row, column)
    #[must_use]
    pub fn selection(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn layout(&self) -> &'static [&'static [char]] {
        self.mode.layout()
    }

    fn clamp_col(&mut self) {
        let len = self.layout()[self.row].len();
        if self.col >= len {
            self.col = len - 1;
        }
    }

    /// Apply one key; returns whether it did anything
    pub fn handle_key(&mut self, key: Key) -> bool {
        if self.status != KeyboardStatus::Editing {
            return false;
        }

        let rows = self.layout().len();
        match key {
            Key::Up => {
                self.row = (self.row + rows - 1) % rows;
                self.clamp_col();
            }
            Key::Down => {
                self.row = (self.row + 1) % rows;
                self.clamp_col();
            }
            Key::Left => {
                let len = self.layout()[self.row].len();
                self.col = (self.col + len - 1) % len;
            }
            Key::Right => {
                let len = self.layout()[self.row].len();
                self.col = (self.col + 1) % len;
            }
            Key::Ok => self.press(self.selected()),
            Key::Back | Key::Home | Key::Quit => self.status = KeyboardStatus::Cancelled,
            Key::Char(c) => self.text.push(c),
            Key::Help => return false,
        }
        true
    }

    fn press(&mut self, key: char) {
        match key {
            DONE => self.status = KeyboardStatus::Done,
            BACKSPACE => {
                self.text.pop();
            }
            SHIFT => {
                self.mode = match self.mode {
                    KeyboardMode::Lower => KeyboardMode::Upper,
                    KeyboardMode::Upper | KeyboardMode::Numbers => KeyboardMode::Lower,
                };
            }
            SYMBOLS => {
                self.mode = match self.mode {
                    KeyboardMode::Numbers => KeyboardMode::Lower,
                    _ => KeyboardMode::Numbers,
                };
            }
            c => self.text.push(c),
        }
    }

    /// Draw the keyboard over the bottom half of the surface
    pub fn render(&self, surface: &mut dyn Surface) {
        let metrics = surface.text_metrics();
        let cw = i32::try_from(metrics.char_width.max(1)).unwrap_or(6);
        let lh = i32::try_from(metrics.line_height.max(1)).unwrap_or(8);
        let width = i32::try_from(surface.width()).unwrap_or(i32::MAX);
        let height = i32::try_from(surface.height()).unwrap_or(i32::MAX);

        let kbd_height = (height / 2).max(6 * lh).min(height);
        let kbd_y = height - kbd_height;
        surface.fill(
            0,
            kbd_y,
            u32::try_from(width).unwrap_or(0),
            u32::try_from(kbd_height).unwrap_or(0),
            Color::rgb(30, 30, 40),
        );

        let mut y = kbd_y + lh / 4;
        surface.draw_text(2, y, &self.prompt, Color::rgb(200, 200, 200));
        y += lh + lh / 4;

        // Show the tail of long input
        let max_chars = usize::try_from((width - 8) / cw).unwrap_or(0);
        let len = self.text.chars().count();
        let shown = if len > max_chars && max_chars > 3 {
            let tail: String = self.text.chars().skip(len + 3 - max_chars).collect();
            format!("...{tail}")
        } else {
            self.text.clone()
        };
        surface.draw_text(4, y, &shown, Color::WHITE);

        let shown_len = i32::try_from(shown.chars().count()).unwrap_or(0);
        let cursor_x = 4 + shown_len * cw;
        if cursor_x < width - 4 {
            surface.fill(
                cursor_x,
                y,
                u32::try_from((cw / 3).max(1)).unwrap_or(1),
                u32::try_from((lh - 1).max(1)).unwrap_or(1),
                Color::rgb(100, 200, 255),
            );
        }
        y += lh + lh / 2;

        let (key_w, key_h, start_x) = if width >= 128 {
            (cw * 5 / 3, lh, 8)
        } else {
            (cw, lh - lh / 4, 2)
        };
        let spacing = cw / 3;

        for (row_idx, row) in self.layout().iter().enumerate() {
            let row_n = i32::try_from(row_idx).unwrap_or(0);
            let row_y = y + row_n * (key_h + spacing);
            let keys = i32::try_from(row.len()).unwrap_or(0);
            let row_width = keys * (key_w + spacing) - spacing;
            let row_x = start_x + (width - start_x * 2 - row_width) / 2;

            for (col_idx, &key) in row.iter().enumerate() {
                let key_x = row_x + i32::try_from(col_idx).unwrap_or(0) * (key_w + spacing);
                let selected = (row_idx, col_idx) == (self.row, self.col);

                let (bg, fg) = if selected {
                    (Color::rgb(100, 150, 255), Color::WHITE)
                } else if matches!(key, SHIFT | BACKSPACE | DONE | SYMBOLS) {
                    (Color::rgb(60, 60, 80), Color::rgb(200, 200, 200))
                } else if key == ' ' {
                    (Color::rgb(50, 50, 60), Color::rgb(200, 200, 200))
                } else {
                    (Color::rgb(70, 70, 90), Color::rgb(200, 200, 200))
                };

                surface.fill(
                    key_x,
                    row_y,
                    u32::try_from(key_w).unwrap_or(1),
                    u32::try_from(key_h).unwrap_or(1),
                    bg,
                );

                let label = if key == ' ' { "SPC".to_string() } else { key.to_string() };
                let label_w = i32::try_from(label.chars().count()).unwrap_or(1) * cw;
                surface.draw_text(key_x + (key_w - label_w) / 2, row_y + 1, &label, fg);
            }
        }

        surface.draw_text(
            2,
            height - lh,
            "ARROWS:NAV ENTER:TYPE ESC:CANCEL",
            Color::rgb(150, 150, 150),
        );
    }
}

/// Run a blocking keyboard session
///
/// Returns the entered text, or `None` if the user cancelled.
///
/// # Errors
///
/// Returns an error if the surface cannot be presented or input cannot be read.
pub fn show_keyboard(
    surface: &mut dyn Surface,
    input: &mut dyn InputSource,
    prompt: &str,
    initial: &str,
) -> Result<Option<String>, DeviceError> {
    let mut keyboard = OnScreenKeyboard::new(prompt, initial);
    let mut dirty = true;

    while keyboard.status() == KeyboardStatus::Editing {
        if dirty {
            surface.clear();
            keyboard.render(surface);
            surface.present()?;
            dirty = false;
        }

        if let Some(event) = input.poll(POLL_INTERVAL)? {
            // A keyboard 'q' is QUIT elsewhere but a letter here
            let key = match (event.key, event.as_char()) {
                (Key::Quit, Some(c)) => Key::Char(c),
                (key, _) => key,
            };
            dirty = keyboard.handle_key(key);
        }
    }

    match keyboard.status() {
        KeyboardStatus::Done => Ok(Some(keyboard.text)),
        _ => Ok(None),
    }
}
