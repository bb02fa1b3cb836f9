//! Drawing Helpers
//!
//! Shapes and widgets the built-in apps share, built on the two primitives
//! every [`Surface`] offers: `fill` and `set_pixel`.

use matrixos_core::{draw_centered_text, Color, Surface};

use crate::theme;

/// Icon edge length for a display of this width
///
/// Small panels get 16px icons, anything from 100px wide gets 32px.
#[must_use]
pub fn icon_size(width: u32) -> u32 {
    if width < 100 {
        16
    } else {
        32
    }
}

/// Draw a one-pixel rectangle outline
pub fn rect_outline(surface: &mut dyn Surface, x: i32, y: i32, w: u32, h: u32, color: Color) {
    if w == 0 || h == 0 {
        return;
    }
    let right = x + to_i32(w) - 1;
    let bottom = y + to_i32(h) - 1;
    surface.fill(x, y, w, 1, color);
    surface.fill(x, bottom, w, 1, color);
    surface.fill(x, y, 1, h, color);
    surface.fill(right, y, 1, h, color);
}

/// Draw a straight line (Bresenham)
pub fn line(surface: &mut dyn Surface, from: (i32, i32), to: (i32, i32), color: Color) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        surface.set_pixel(x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Draw a filled circle
pub fn filled_circle(surface: &mut dyn Surface, cx: i32, cy: i32, radius: i32, color: Color) {
    if radius <= 0 {
        surface.set_pixel(cx, cy, color);
        return;
    }
    for dy in -radius..=radius {
        // Widest x offset still inside the circle on this row
        let mut span = 0;
        while (span + 1) * (span + 1) + dy * dy <= radius * radius {
            span += 1;
        }
        surface.fill(cx - span, cy + dy, to_u32(2 * span + 1), 1, color);
    }
}

/// Draw a horizontal progress bar, `progress` in 0.0..=1.0
pub fn progress_bar(surface: &mut dyn Surface, x: i32, y: i32, w: u32, h: u32, progress: f32, color: Color) {
    surface.fill(x, y, w, h, theme::TRACK_GRAY);
    let filled = progress_width(w, progress);
    if filled > 0 {
        surface.fill(x, y, filled, h, color);
    }
}

/// Width in pixels of the filled part of a progress bar
#[must_use]
pub fn progress_width(w: u32, progress: f32) -> u32 {
    let clamped = progress.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = (w as f32 * clamped).round() as u32;
    filled.min(w)
}

/// Draw a vertical menu, highlighting `selected`
///
/// Each row is one text line tall; the selected row gets a `>` marker and
/// the highlight color.
pub fn menu_list(surface: &mut dyn Surface, items: &[String], selected: usize, y_start: i32) {
    let line_height = to_i32(surface.text_metrics().line_height);
    for (i, item) in items.iter().enumerate() {
        let y = y_start + to_i32(i as u32) * line_height;
        if i == selected {
            draw_centered_text(surface, y, &format!("> {item} <"), theme::SELECT_YELLOW);
        } else {
            draw_centered_text(surface, y, item, theme::DIM_GRAY);
        }
    }
}

/// Saturating pixel conversion
pub(crate) fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Clamp a possibly negative pixel length to zero
pub(crate) fn to_u32(v: i32) -> u32 {
    u32::try_from(v).unwrap_or(0)
}
