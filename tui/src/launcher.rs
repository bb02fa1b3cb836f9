//! Launcher
//!
//! The home screen: a grid of catalog entries. Arrow keys move the
//! selection, OK asks the scheduler to launch the selected app.
//!
//! # Layout
//!
//! ```text
//!   ┌──────────────────────┐
//!   │ ┏━━┓ ┌──┐ ┌──┐       │   icon_size + padding per cell,
//!   │ ┃T ┃ │W │ │  │       │   10px reserved at the bottom
//!   │ ┗━━┛ └──┘ └──┘       │   for the selected app's name
//!   │        TIMER         │
//!   └──────────────────────┘
//! ```

use matrixos_core::{
    draw_centered_text, AppDescriptor, Application, Context, HelpEntry, HookResult, InputEvent, Key,
    Surface,
};

use crate::draw::{self, to_i32};
use crate::theme;

/// Pixels reserved below the grid for the selected app's name
const NAME_STRIP: u32 = 10;

/// Grid geometry for one display size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridLayout {
    /// Icon edge length
    pub icon_size: u32,
    /// Gap between icons
    pub padding: u32,
    /// Icons per row
    pub columns: usize,
    /// Rows that fit above the name strip
    pub rows: usize,
}

impl GridLayout {
    /// Compute the grid for a `width` x `height` display
    #[must_use]
    pub fn for_display(width: u32, height: u32) -> Self {
        let icon_size = draw::icon_size(width);
        let padding = if icon_size >= 32 { 4 } else { 2 };
        let cell = icon_size + padding;
        Self {
            icon_size,
            padding,
            columns: ((width + padding) / cell).max(1) as usize,
            rows: (height.saturating_sub(NAME_STRIP) + padding) as usize / cell as usize,
        }
    }

    /// Top-left pixel of the icon at `index`
    #[must_use]
    pub fn position(&self, index: usize) -> (i32, i32) {
        let cell = to_i32(self.icon_size + self.padding);
        let pad = to_i32(self.padding);
        let col = to_i32(u32::try_from(index % self.columns).unwrap_or(0));
        let row = to_i32(u32::try_from(index / self.columns).unwrap_or(0));
        (col * cell + pad, row * cell + pad)
    }

    /// How many icons fit on screen
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.columns * self.rows
    }
}

/// Home screen application
pub struct Launcher {
    entries: Vec<AppDescriptor>,
    selected: usize,
    columns: usize,
}

impl Launcher {
    /// Create a launcher for these catalog entries
    #[must_use]
    pub fn new(entries: Vec<AppDescriptor>) -> Self {
        Self {
            entries,
            selected: 0,
            columns: 1,
        }
    }

    /// Index of the selected entry
    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// The selected entry, if any
    #[must_use]
    pub fn selected_entry(&self) -> Option<&AppDescriptor> {
        self.entries.get(self.selected)
    }

    /// Move the selection; returns whether it changed
    fn navigate(&mut self, key: Key) -> bool {
        let count = self.entries.len();
        let cols = self.columns.max(1);
        let before = self.selected;

        match key {
            Key::Up if self.selected >= cols => self.selected -= cols,
            Key::Down if (self.selected / cols + 1) * cols < count => {
                self.selected = (self.selected + cols).min(count - 1);
            }
            Key::Left if self.selected % cols > 0 => self.selected -= 1,
            Key::Right if self.selected % cols < cols - 1 && self.selected + 1 < count => {
                self.selected += 1;
            }
            _ => {}
        }
        self.selected != before
    }
}

impl Application for Launcher {
    fn name(&self) -> &str {
        "Launcher"
    }

    fn help_entries(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new("ARROWS", "Select app"), HelpEntry::new("OK", "Launch")]
    }

    fn on_event(&mut self, cx: &mut Context<'_>, event: &InputEvent) -> HookResult<bool> {
        match event.key {
            Key::Up | Key::Down | Key::Left | Key::Right => Ok(self.navigate(event.key)),
            Key::Ok => {
                if let Some(entry) = self.entries.get(self.selected) {
                    tracing::info!(app = %entry.id, "Launching from home screen");
                    cx.launch(entry.id.clone());
                }
                Ok(true)
            }
            // Already home
            Key::Back => Ok(true),
            _ => Ok(false),
        }
    }

    fn render(&mut self, _cx: &mut Context<'_>, surface: &mut dyn Surface) -> HookResult {
        let grid = GridLayout::for_display(surface.width(), surface.height());
        self.columns = grid.columns;

        if self.entries.is_empty() {
            let y = to_i32(surface.height() / 2);
            draw_centered_text(surface, y, "NO APPS", theme::DIM_GRAY);
            return Ok(());
        }

        let metrics = surface.text_metrics();
        for (index, entry) in self.entries.iter().enumerate().take(grid.capacity()) {
            let (x, y) = grid.position(index);
            if index == self.selected {
                draw::rect_outline(
                    surface,
                    x - 1,
                    y - 1,
                    grid.icon_size + 2,
                    grid.icon_size + 2,
                    theme::SELECT_YELLOW,
                );
            }
            surface.fill(x, y, grid.icon_size, grid.icon_size, theme::tile_color(index));

            let initial: String = entry.manifest.name.chars().take(1).collect::<String>().to_uppercase();
            let tx = x + to_i32(grid.icon_size.saturating_sub(metrics.char_width) / 2);
            let ty = y + to_i32(grid.icon_size.saturating_sub(metrics.line_height) / 2);
            surface.draw_text(tx, ty, &initial, theme::TEXT_WHITE);
        }

        if let Some(entry) = self.selected_entry() {
            let name_y = to_i32(surface.height().saturating_sub(NAME_STRIP) + 2);
            draw_centered_text(surface, name_y, &entry.manifest.name.to_uppercase(), theme::TEXT_WHITE);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrixos_core::AppManifest;

    fn entries(n: usize) -> Vec<AppDescriptor> {
        (0..n)
            .map(|i| AppDescriptor {
                id: format!("app{i}"),
                manifest: AppManifest::new(format!("App {i}")),
            })
            .collect()
    }

    #[test]
    fn test_grid_for_small_panel() {
        let grid = GridLayout::for_display(64, 64);
        assert_eq!(grid.icon_size, 16);
        assert_eq!(grid.columns, 3);
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.position(0), (2, 2));
        assert_eq!(grid.position(4), (20, 20));
    }

    #[test]
    fn test_grid_for_large_panel() {
        let grid = GridLayout::for_display(128, 128);
        assert_eq!(grid.icon_size, 32);
        assert_eq!(grid.padding, 4);
        assert_eq!(grid.columns, 3);
        assert_eq!(grid.capacity(), 9);
    }

    #[test]
    fn test_navigation_stays_in_grid() {
        let mut launcher = Launcher::new(entries(5));
        launcher.columns = 3;

        assert!(!launcher.navigate(Key::Up));
        assert!(!launcher.navigate(Key::Left));
        assert!(launcher.navigate(Key::Right));
        assert!(launcher.navigate(Key::Right));
        assert_eq!(launcher.selected(), 2);
        assert!(!launcher.navigate(Key::Right));

        // Row below is shorter: clamp to the last entry
        assert!(launcher.navigate(Key::Down));
        assert_eq!(launcher.selected(), 4);
        assert!(!launcher.navigate(Key::Down));

        assert!(launcher.navigate(Key::Up));
        assert_eq!(launcher.selected(), 1);
    }

    #[test]
    fn test_navigation_with_no_entries() {
        let mut launcher = Launcher::new(Vec::new());
        for key in [Key::Up, Key::Down, Key::Left, Key::Right] {
            assert!(!launcher.navigate(key));
        }
        assert!(launcher.selected_entry().is_none());
    }
}
