//! MatrixOS TUI - Terminal host for the MatrixOS runtime
//!
//! Runs the headless scheduler from `matrixos-core` on a terminal, drawing
//! the pixel display with half-block characters.
//!
//! # Architecture
//!
//! The host only supplies devices and applications. All scheduling lives in
//! `matrixos-core`.
//!
//! - **TerminalSurface**: ratatui framebuffer, two pixels per cell
//! - **TerminalInput**: crossterm key events mapped to logical keys
//! - **Launcher**: the home screen grid
//! - **Apps**: built-in timer and weather, and their catalog
//!
//! ## Event Flow
//!
//! ```text
//! crossterm KeyEvent -> InputEvent -> Scheduler -> App hooks -> Surface -> ratatui Buffer
//! ```

pub mod apps;
pub mod draw;
pub mod input;
pub mod launcher;
pub mod surface;
pub mod theme;

pub use apps::{builtin_catalog, TimerApp, WeatherApp};
pub use input::{map_key_event, TerminalInput};
pub use launcher::Launcher;
pub use surface::TerminalSurface;
