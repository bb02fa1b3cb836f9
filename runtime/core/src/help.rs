//! Help Overlay
//!
//! Content and drawing for the modal help screen. The overlay lists the
//! active application's own keys followed by the keys every application
//! shares. Scrolling state lives in [`crate::mode::ModeRouter`]; this module
//! only turns a scroll offset into pixels.
//!
//! # Layout
//!
//! ```text
//!   ┌────────────────────┐
//!   │        HELP        │  title
//!   │         ^          │  more above
//!   │ APP KEYS:          │  ┐
//!   │  OK   START        │  │ visible_lines
//!   │  ...               │  ┘
//!   │         v          │  more below
//!   │ TAB/BKSP TO CLOSE  │  footer
//!   └────────────────────┘
//! ```
//!
//! All offsets scale with the surface's [`TextMetrics`], so the same layout
//! works for an 8px LED font and a terminal text row.

use crate::app::HelpEntry;
use crate::mode::HelpMetrics;
use crate::surface::{draw_centered_text, Color, Surface, TextMetrics};

/// Overlay background
const BACKGROUND: Color = Color::rgb(20, 20, 40);
/// Description text
const DESCRIPTION: Color = Color::rgb(150, 150, 150);

const KEY_WIDTH: usize = 4;
const DESCRIPTION_WIDTH: usize = 10;

/// Keys every application shares, as shown on the overlay
const UNIVERSAL_KEYS: [(&str, &str); 4] = [
    ("ESC", "EXIT APP"),
    ("BKSP", "GO BACK"),
    ("Q", "QUIT OS"),
    ("TAB", "THIS HELP"),
];

/// One line of the help overlay
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HelpLine {
    /// Section title
    Header(String),
    /// Blank separator
    Spacer,
    /// Key and what it does
    Entry {
        /// Key label, at most four characters
        key: String,
        /// Description, at most ten characters
        description: String,
    },
}

fn fit(text: &str, width: usize) -> String {
    text.chars().take(width).collect::<String>().to_uppercase()
}

/// Build the overlay content for an application's help entries
#[must_use]
pub fn build_help_lines(app_entries: &[HelpEntry]) -> Vec<HelpLine> {
    let mut lines = Vec::with_capacity(app_entries.len() + UNIVERSAL_KEYS.len() + 3);

    if !app_entries.is_empty() {
        lines.push(HelpLine::Header("APP KEYS:".to_string()));
        lines.extend(app_entries.iter().map(|e| HelpLine::Entry {
            key: fit(&e.key, KEY_WIDTH),
            description: fit(&e.description, DESCRIPTION_WIDTH),
        }));
    }

    lines.push(HelpLine::Spacer);
    lines.push(HelpLine::Header("UNIVERSAL:".to_string()));
    lines.extend(UNIVERSAL_KEYS.iter().map(|(key, description)| HelpLine::Entry {
        key: (*key).to_string(),
        description: (*description).to_string(),
    }));

    lines
}

/// Pixel positions of the overlay's parts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HelpLayout {
    /// Title baseline
    pub title_y: i32,
    /// "more above" indicator
    pub up_indicator_y: i32,
    /// First content line
    pub start_y: i32,
    /// Distance between content lines
    pub line_height: i32,
    /// "more below" indicator
    pub down_indicator_y: i32,
    /// Footer line
    pub footer_y: i32,
    /// Section header x
    pub header_x: i32,
    /// Key column x
    pub key_x: i32,
    /// Description column x
    pub description_x: i32,
    /// Content lines that fit between the indicators
    pub visible_lines: usize,
}

impl HelpLayout {
    /// Compute the layout for a surface of `height` pixels
    #[must_use]
    pub fn new(height: u32, metrics: TextMetrics) -> Self {
        let lh = i32::try_from(metrics.line_height.max(1)).unwrap_or(8);
        let cw = i32::try_from(metrics.char_width.max(1)).unwrap_or(6);
        let height = i32::try_from(height).unwrap_or(i32::MAX);

        let start_y = 2 * lh - lh / 4;
        let usable = height - start_y - 2 * lh;
        let visible_lines = usize::try_from(usable / lh).unwrap_or(0);
        let key_x = cw;

        Self {
            title_y: lh / 2,
            up_indicator_y: start_y - 3 * lh / 4,
            start_y,
            line_height: lh,
            down_indicator_y: height - 2 * lh + lh / 4,
            footer_y: height - lh,
            header_x: cw * 2 / 3,
            key_x,
            description_x: key_x + (cw * 11 + 2) / 3,
            visible_lines,
        }
    }

    /// Layout for a concrete surface
    #[must_use]
    pub fn for_surface(surface: &dyn Surface) -> Self {
        Self::new(surface.height(), surface.text_metrics())
    }

    /// Scroll metrics for `item_count` lines of content
    #[must_use]
    pub fn metrics(&self, item_count: usize) -> HelpMetrics {
        HelpMetrics {
            item_count,
            visible_lines: self.visible_lines,
        }
    }
}

/// Draw the overlay with content scrolled to `scroll`
pub fn render_help(surface: &mut dyn Surface, lines: &[HelpLine], scroll: usize) {
    let layout = HelpLayout::for_surface(surface);
    let (width, height) = (surface.width(), surface.height());

    surface.fill(0, 0, width, height, BACKGROUND);
    draw_centered_text(surface, layout.title_y, "HELP", Color::YELLOW);

    let start = scroll.min(lines.len());
    let end = (start + layout.visible_lines).min(lines.len());

    let mut y = layout.start_y;
    for line in &lines[start..end] {
        match line {
            HelpLine::Header(text) => surface.draw_text(layout.header_x, y, text, Color::CYAN),
            HelpLine::Spacer => {}
            HelpLine::Entry { key, description } => {
                surface.draw_text(layout.key_x, y, key, Color::WHITE);
                if !description.is_empty() {
                    surface.draw_text(layout.description_x, y, description, DESCRIPTION);
                }
            }
        }
        y += layout.line_height;
    }

    if start > 0 {
        draw_centered_text(surface, layout.up_indicator_y, "^", Color::YELLOW);
    }
    if end < lines.len() {
        draw_centered_text(surface, layout.down_indicator_y, "v", Color::YELLOW);
    }

    draw_centered_text(surface, layout.footer_y, "TAB/BKSP TO CLOSE", Color::GREY);
}
