//! Display Surface Abstraction
//!
//! The runtime never touches display hardware directly. Everything that draws
//! goes through the [`Surface`] trait: the scheduler clears it, hands it to the
//! active application's `render` hook, and presents it once per dirty frame.
//!
//! # Design Philosophy
//!
//! The scheduler never inspects pixel contents. A surface only has to accept
//! drawing calls and push the finished frame somewhere. The terminal host
//! implements it with half-block characters; tests use [`HeadlessSurface`],
//! which records every call so assertions can be made about what was drawn.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised by display or input devices
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Underlying I/O failure (terminal write, device read)
    #[error("Device I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device went away
    #[error("Device disconnected: {0}")]
    Disconnected(String),
}

// =============================================================================
// Colors and Metrics
// =============================================================================

/// An RGB pixel color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Black (the cleared state)
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// White
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Dim grey used for secondary text
    pub const GREY: Self = Self::rgb(100, 100, 100);
    /// Help overlay header color
    pub const YELLOW: Self = Self::rgb(255, 255, 0);
    /// Help overlay key color
    pub const CYAN: Self = Self::rgb(0, 255, 255);
    /// Help overlay scroll indicator color
    pub const GREEN: Self = Self::rgb(0, 255, 0);
    /// Alarm color
    pub const RED: Self = Self::rgb(255, 0, 0);

    /// Build a color from channels
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Whether the color is pure black
    #[must_use]
    pub fn is_black(&self) -> bool {
        *self == Self::BLACK
    }

    /// Perceived brightness (0-255), used by monochrome displays
    #[must_use]
    pub fn luma(&self) -> u8 {
        let l = (u32::from(self.r) * 299 + u32::from(self.g) * 587 + u32::from(self.b) * 114) / 1000;
        u8::try_from(l).unwrap_or(u8::MAX)
    }
}

/// Text cell geometry of a surface, in pixels
///
/// Used by layout code (help overlay, keyboard) to decide how many lines fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextMetrics {
    /// Horizontal advance of one character
    pub char_width: u32,
    /// Vertical distance between text baselines
    pub line_height: u32,
}

impl Default for TextMetrics {
    /// The 5x7 bitmap font used on LED panels, with one pixel of spacing
    fn default() -> Self {
        Self {
            char_width: 6,
            line_height: 8,
        }
    }
}

// =============================================================================
// Surface Trait
// =============================================================================

/// A drawable pixel surface
///
/// Coordinates are in pixels with the origin at the top-left. Drawing outside
/// the surface is clipped silently.
pub trait Surface {
    /// Width in pixels
    fn width(&self) -> u32;

    /// Height in pixels
    fn height(&self) -> u32;

    /// Text geometry for this surface
    fn text_metrics(&self) -> TextMetrics {
        TextMetrics::default()
    }

    /// Clear the whole surface to black
    fn clear(&mut self);

    /// Fill a rectangle
    fn fill(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color);

    /// Set a single pixel
    fn set_pixel(&mut self, x: i32, y: i32, color: Color);

    /// Draw a single line of text with its top-left corner at (x, y)
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color);

    /// Push the finished frame to the display
    ///
    /// # Errors
    ///
    /// Returns an error if the display cannot be written.
    fn present(&mut self) -> Result<(), DeviceError>;
}

/// Draw text horizontally centered on the surface
pub fn draw_centered_text(surface: &mut dyn Surface, y: i32, text: &str, color: Color) {
    let metrics = surface.text_metrics();
    let text_width = text.chars().count() as u32 * metrics.char_width;
    let x = surface.width().saturating_sub(text_width) / 2;
    surface.draw_text(i32::try_from(x).unwrap_or(0), y, text, color);
}

// =============================================================================
// Headless Surface
// =============================================================================

/// A line of text recorded by [`HeadlessSurface`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawnText {
    /// X position
    pub x: i32,
    /// Y position
    pub y: i32,
    /// The text
    pub text: String,
    /// Color it was drawn with
    pub color: Color,
}

#[derive(Debug, Default)]
struct HeadlessFrame {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
    text: Vec<DrawnText>,
    clears: usize,
    presents: usize,
    last_presented_text: Vec<DrawnText>,
}

/// In-memory surface for tests and headless runs
///
/// Cloning produces another handle to the same frame, so a test can hand one
/// handle to the scheduler and keep another for inspection.
#[derive(Clone, Debug)]
pub struct HeadlessSurface {
    inner: Arc<Mutex<HeadlessFrame>>,
    metrics: TextMetrics,
}

impl HeadlessSurface {
    /// Create a black surface of the given size
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HeadlessFrame {
                width,
                height,
                pixels: vec![Color::BLACK; (width * height) as usize],
                ..HeadlessFrame::default()
            })),
            metrics: TextMetrics::default(),
        }
    }

    /// Use custom text metrics
    #[must_use]
    pub fn with_text_metrics(mut self, metrics: TextMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Number of times the frame was presented
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.inner.lock().presents
    }

    /// Number of times the frame was cleared
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.inner.lock().clears
    }

    /// Read back a pixel (black when out of bounds)
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let frame = self.inner.lock();
        if x >= frame.width || y >= frame.height {
            return Color::BLACK;
        }
        frame.pixels[(y * frame.width + x) as usize]
    }

    /// Text drawn since the last clear
    #[must_use]
    pub fn text(&self) -> Vec<DrawnText> {
        self.inner.lock().text.clone()
    }

    /// Text that was on screen at the last present
    #[must_use]
    pub fn presented_text(&self) -> Vec<String> {
        self.inner
            .lock()
            .last_presented_text
            .iter()
            .map(|t| t.text.clone())
            .collect()
    }

    /// Whether any text currently drawn contains `needle`
    #[must_use]
    pub fn contains_text(&self, needle: &str) -> bool {
        self.inner.lock().text.iter().any(|t| t.text.contains(needle))
    }
}

impl Surface for HeadlessSurface {
    fn width(&self) -> u32 {
        self.inner.lock().width
    }

    fn height(&self) -> u32 {
        self.inner.lock().height
    }

    fn text_metrics(&self) -> TextMetrics {
        self.metrics
    }

    fn clear(&mut self) {
        let mut frame = self.inner.lock();
        frame.pixels.fill(Color::BLACK);
        frame.text.clear();
        frame.clears += 1;
    }

    fn fill(&mut self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                self.set_pixel(x + dx, y + dy, color);
            }
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let mut frame = self.inner.lock();
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x < frame.width && y < frame.height {
            let idx = (y * frame.width + x) as usize;
            frame.pixels[idx] = color;
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        self.inner.lock().text.push(DrawnText {
            x,
            y,
            text: text.to_string(),
            color,
        });
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        let mut frame = self.inner.lock();
        frame.presents += 1;
        frame.last_presented_text = frame.text.clone();
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_surface_pixels_are_clipped() {
        let mut surface = HeadlessSurface::new(4, 4);
        surface.set_pixel(1, 2, Color::RED);
        surface.set_pixel(-1, 0, Color::RED);
        surface.set_pixel(4, 0, Color::RED);

        assert_eq!(surface.pixel(1, 2), Color::RED);
        assert_eq!(surface.pixel(0, 0), Color::BLACK);
        assert_eq!(surface.pixel(9, 9), Color::BLACK);
    }

    #[test]
    fn test_headless_surface_clear_resets_frame() {
        let mut surface = HeadlessSurface::new(8, 8);
        surface.fill(0, 0, 8, 8, Color::WHITE);
        surface.draw_text(0, 0, "HI", Color::WHITE);
        surface.clear();

        assert_eq!(surface.pixel(3, 3), Color::BLACK);
        assert!(surface.text().is_empty());
        assert_eq!(surface.clear_count(), 1);
    }

    #[test]
    fn test_handles_share_state() {
        let observer = HeadlessSurface::new(8, 8);
        let mut writer = observer.clone();
        writer.draw_text(0, 0, "HELLO", Color::WHITE);
        writer.present().unwrap();

        assert_eq!(observer.present_count(), 1);
        assert_eq!(observer.presented_text(), vec!["HELLO".to_string()]);
    }

    #[test]
    fn test_draw_centered_text() {
        let mut surface = HeadlessSurface::new(64, 64);
        draw_centered_text(&mut surface, 10, "ABCD", Color::WHITE);

        let text = surface.text();
        // 4 chars * 6 px = 24 px wide, (64 - 24) / 2 = 20
        assert_eq!(text[0].x, 20);
        assert_eq!(text[0].y, 10);
    }

    #[test]
    fn test_luma() {
        assert_eq!(Color::BLACK.luma(), 0);
        assert_eq!(Color::WHITE.luma(), 255);
        assert!(Color::RED.luma() < Color::GREEN.luma());
    }
}
