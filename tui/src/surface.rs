//! Terminal Display Surface
//!
//! Renders the device framebuffer into a terminal with ratatui.
//!
//! # Half-Block Cells
//!
//! Terminal cells are roughly twice as tall as they are wide, so each cell
//! shows two vertically stacked pixels using the upper half block:
//!
//! ```text
//!   pixel (x, 2r)     ─►  foreground of '▀'
//!   pixel (x, 2r + 1) ─►  background of '▀'
//! ```
//!
//! A 64x64 display therefore occupies 64 columns by 32 rows, centered in the
//! terminal and clipped if the terminal is smaller.
//!
//! Text is not rasterized: it is drawn as terminal characters over the pixel
//! cells, one character per pixel column and one line per cell row. That is
//! what [`TextMetrics`] reports to layout code.

use matrixos_core::{Color, ColorMode, DeviceError, Surface, TextMetrics};
use ratatui::backend::Backend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::Terminal;
use unicode_width::UnicodeWidthChar;

use crate::theme::to_terminal;

/// Upper half block: foreground is the top pixel, background the bottom one
const HALF_BLOCK: &str = "▀";

/// Text geometry of the half-block display
pub const TERMINAL_METRICS: TextMetrics = TextMetrics {
    char_width: 1,
    line_height: 2,
};

/// A text run waiting to be composed over the pixels
#[derive(Clone, Debug)]
struct TextRun {
    x: i32,
    y: i32,
    text: String,
    color: Color,
}

/// Device pixels plus pending text, independent of any terminal
#[derive(Clone, Debug)]
struct Framebuffer {
    width: u32,
    height: u32,
    color_mode: ColorMode,
    pixels: Vec<Color>,
    text: Vec<TextRun>,
}

impl Framebuffer {
    fn new(width: u32, height: u32, color_mode: ColorMode) -> Self {
        Self {
            width,
            height,
            color_mode,
            pixels: vec![Color::BLACK; (width as usize) * (height as usize)],
            text: Vec::new(),
        }
    }

    fn rows(&self) -> u32 {
        self.height.div_ceil(2)
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    fn pixel(&self, x: u32, y: u32) -> Color {
        if x >= self.width || y >= self.height {
            return Color::BLACK;
        }
        self.pixels[self.index(x, y)]
    }

    /// Top-left cell of the display inside `area`
    fn origin(&self, area: Rect) -> (u16, u16) {
        let cols = u16::try_from(self.width).unwrap_or(u16::MAX);
        let rows = u16::try_from(self.rows()).unwrap_or(u16::MAX);
        (
            area.x + area.width.saturating_sub(cols) / 2,
            area.y + area.height.saturating_sub(rows) / 2,
        )
    }

    /// Compose pixels and text into a ratatui buffer
    fn compose(&self, buf: &mut Buffer, area: Rect) {
        let origin = self.origin(area);
        let limit = (area.x + area.width, area.y + area.height);

        for row in 0..self.rows() {
            let Some(cy) = cell_coord(origin.1, row, limit.1) else {
                break;
            };
            for col in 0..self.width {
                let Some(cx) = cell_coord(origin.0, col, limit.0) else {
                    break;
                };
                let top = self.pixel(col, row * 2);
                let lower = self.pixel(col, row * 2 + 1);
                if let Some(cell) = buf.cell_mut((cx, cy)) {
                    cell.set_symbol(HALF_BLOCK)
                        .set_fg(to_terminal(top, self.color_mode))
                        .set_bg(to_terminal(lower, self.color_mode));
                }
            }
        }

        for run in &self.text {
            self.compose_text(buf, run, origin, limit);
        }
    }

    fn compose_text(&self, buf: &mut Buffer, run: &TextRun, origin: (u16, u16), limit: (u16, u16)) {
        if run.y < 0 {
            return;
        }
        let Ok(row) = u32::try_from(run.y / 2) else {
            return;
        };
        let Some(cy) = (row < self.rows()).then(|| cell_coord(origin.1, row, limit.1)).flatten() else {
            return;
        };
        let style = Style::default().fg(to_terminal(run.color, self.color_mode));

        let mut col = i64::from(run.x);
        for ch in run.text.chars() {
            let w = i64::try_from(ch.width().unwrap_or(0)).unwrap_or(0);
            if w == 0 {
                continue;
            }
            // Characters hanging off either edge of the display are dropped
            let inside = col >= 0 && col + w <= i64::from(self.width);
            if let (true, Ok(c)) = (inside, u32::try_from(col)) {
                if let Some(cx) = cell_coord(origin.0, c, limit.0) {
                    let mut utf8 = [0u8; 4];
                    buf.set_string(cx, cy, ch.encode_utf8(&mut utf8), style);
                }
            }
            col += w;
        }
    }
}

/// Terminal coordinate of display cell `offset`, if it is inside the terminal
fn cell_coord(origin: u16, offset: u32, limit: u16) -> Option<u16> {
    let offset = u16::try_from(offset).ok()?;
    let coord = origin.checked_add(offset)?;
    (coord < limit).then_some(coord)
}

// ============================================================================
// Terminal Surface
// ============================================================================

/// Pixel surface drawn into a ratatui terminal
pub struct TerminalSurface<B: Backend> {
    terminal: Terminal<B>,
    fb: Framebuffer,
}

impl<B: Backend> TerminalSurface<B> {
    /// Create a surface of `width` x `height` pixels on `terminal`
    pub fn new(terminal: Terminal<B>, width: u32, height: u32, color_mode: ColorMode) -> Self {
        Self {
            terminal,
            fb: Framebuffer::new(width, height, color_mode),
        }
    }

    /// The underlying terminal
    #[must_use]
    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Terminal rows needed to show the whole display
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.fb.rows()
    }
}

impl<B: Backend> Surface for TerminalSurface<B> {
    fn width(&self) -> u32 {
        self.fb.width
    }

    fn height(&self) -> u32 {
        self.fb.height
    }

    fn text_metrics(&self) -> TextMetrics {
        TERMINAL_METRICS
    }

    fn clear(&mut self) {
        self.fb.pixels.fill(Color::BLACK);
        self.fb.text.clear();
    }

    fn fill(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        let clip = |start: i32, len: u32, max: u32| {
            let lo = u32::try_from(start.max(0)).unwrap_or(0);
            let hi = i64::from(start) + i64::from(len);
            let hi = u32::try_from(hi.clamp(0, i64::from(max))).unwrap_or(max);
            lo..hi
        };
        let cols = clip(x, w, self.fb.width);
        for py in clip(y, h, self.fb.height) {
            for px in cols.clone() {
                let idx = self.fb.index(px, py);
                self.fb.pixels[idx] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x < self.fb.width && y < self.fb.height {
            let idx = self.fb.index(x, y);
            self.fb.pixels[idx] = color;
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        self.fb.text.push(TextRun {
            x,
            y,
            text: text.to_string(),
            color,
        });
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        let fb = &self.fb;
        self.terminal.draw(|frame| {
            let area = frame.area();
            fb.compose(frame.buffer_mut(), area);
        })?;
        Ok(())
    }
}
