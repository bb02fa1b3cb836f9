//! Theme and Colors
//!
//! The MatrixOS palette, shared by the launcher and the built-in apps, and
//! the mapping from device pixels to terminal colors.
//!
//! Apps draw with [`matrixos_core::Color`]; only the terminal surface ever
//! sees a ratatui [`TermColor`].

use matrixos_core::{Color, ColorMode};
use ratatui::style::Color as TermColor;

// ============================================================================
// UI Colors
// ============================================================================

/// Titles
pub const TITLE_CYAN: Color = Color::rgb(0, 255, 255);

/// Primary text
pub const TEXT_WHITE: Color = Color::rgb(255, 255, 255);

/// Key hints and footers
pub const HINT_GRAY: Color = Color::rgb(150, 150, 150);

/// Secondary text (locations, descriptions)
pub const DIM_GRAY: Color = Color::rgb(100, 100, 100);

/// Barely-there status text
pub const FAINT_GRAY: Color = Color::rgb(80, 80, 80);

/// Selection highlight
pub const SELECT_YELLOW: Color = Color::rgb(255, 255, 0);

/// Running state
pub const RUN_GREEN: Color = Color::rgb(0, 255, 0);

/// Paused state
pub const PAUSE_ORANGE: Color = Color::rgb(255, 165, 0);

/// Progress bar track
pub const TRACK_GRAY: Color = Color::rgb(40, 40, 40);

// ============================================================================
// Alarm Colors
// ============================================================================

/// Alarm flash, bright phase
pub const ALARM_BRIGHT: Color = Color::rgb(255, 0, 0);

/// Alarm flash, dim phase
pub const ALARM_DIM: Color = Color::rgb(100, 0, 0);

/// Alarm text in the dim phase
pub const ALARM_TEXT_DIM: Color = Color::rgb(200, 200, 200);

// ============================================================================
// Launcher Tiles
// ============================================================================

/// Tile colors, assigned to catalog entries in order
pub const TILE_COLORS: [Color; 6] = [
    Color::rgb(0, 160, 255),
    Color::rgb(255, 120, 0),
    Color::rgb(0, 200, 100),
    Color::rgb(200, 0, 200),
    Color::rgb(230, 200, 0),
    Color::rgb(255, 60, 60),
];

/// Tile color for the `index`th catalog entry
#[must_use]
pub fn tile_color(index: usize) -> Color {
    TILE_COLORS[index % TILE_COLORS.len()]
}

// ============================================================================
// Terminal Mapping
// ============================================================================

/// Convert a device pixel to a terminal color
///
/// Monochrome displays show brightness only, so mono mode collapses the
/// color to its luma.
#[must_use]
pub fn to_terminal(color: Color, mode: ColorMode) -> TermColor {
    match mode {
        ColorMode::Rgb => TermColor::Rgb(color.r, color.g, color.b),
        ColorMode::Mono => {
            let l = color.luma();
            TermColor::Rgb(l, l, l)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_passthrough() {
        assert_eq!(to_terminal(PAUSE_ORANGE, ColorMode::Rgb), TermColor::Rgb(255, 165, 0));
    }

    #[test]
    fn test_mono_uses_luma() {
        assert_eq!(to_terminal(Color::WHITE, ColorMode::Mono), TermColor::Rgb(255, 255, 255));
        assert_eq!(to_terminal(Color::BLACK, ColorMode::Mono), TermColor::Rgb(0, 0, 0));

        let TermColor::Rgb(r, g, b) = to_terminal(ALARM_BRIGHT, ColorMode::Mono) else {
            panic!("expected an rgb color");
        };
        assert_eq!((r, g, b), (76, 76, 76));
    }

    #[test]
    fn test_tile_colors_wrap() {
        assert_eq!(tile_color(0), tile_color(TILE_COLORS.len()));
    }
}
