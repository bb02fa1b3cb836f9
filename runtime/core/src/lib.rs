//! MatrixOS Core - Headless Application Runtime for Pixel Displays
//!
//! This crate hosts several independently written applications on one small
//! pixel display. Exactly one application is foreground at a time; the rest
//! keep running cheap background ticks and off-path tasks, and can ask to be
//! brought forward when something needs the user.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        Device Hosts                               │
//! │   ┌──────────────────┐   ┌──────────────┐   ┌──────────────────┐  │
//! │   │  Terminal (tui)  │   │  LED panel   │   │ Headless / tests │  │
//! │   └────────┬─────────┘   └──────┬───────┘   └────────┬─────────┘  │
//! │            └────── Surface + InputSource ────────────┘            │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼──────────────────────────────────┐
//! │                         MATRIXOS CORE                             │
//! │  ┌────────────────────────────┴───────────────────────────────┐  │
//! │  │                        Scheduler                            │  │
//! │  │  ┌────────────┐ ┌────────────┐ ┌───────────┐ ┌───────────┐  │  │
//! │  │  │ ModeRouter │ │ Attention  │ │   Task    │ │  Catalog  │  │  │
//! │  │  │ help/kbd   │ │   Queue    │ │  Bridge   │ │           │  │  │
//! │  │  └────────────┘ └────────────┘ └─────┬─────┘ └───────────┘  │  │
//! │  └──────────────────────────────────────┼──────────────────────┘  │
//! │                                         │ Executor                │
//! │                              tokio / threads / inline             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Scheduler`]: Owns the applications and runs the frame loop
//! - [`Application`]: The trait every hosted program implements
//! - [`Context`]: Handed to hooks; the application's only channel back
//! - [`TaskBridge`]: Runs work off the frame loop and delivers results on it
//! - [`AttentionQueue`]: Priority queue of foreground requests
//! - [`ModeRouter`]: Routes input to the application, help overlay or keyboard
//!
//! # Quick Start
//!
//! ```ignore
//! use matrixos_core::{HeadlessInput, HeadlessSurface, RuntimeConfig, Scheduler};
//!
//! let mut scheduler = Scheduler::new(
//!     RuntimeConfig::default(),
//!     Box::new(HeadlessSurface::new(64, 64)),
//!     Box::new(HeadlessInput::new()),
//! );
//! scheduler.set_launcher(Box::new(MyLauncher::default()));
//! scheduler.register(Box::new(MyTimer::default()));
//! scheduler.run()?;
//! ```
//!
//! # Module Overview
//!
//! - [`app`]: Application trait, IDs and flags
//! - [`attention`]: Attention priorities and queue
//! - [`catalog`]: Installable application catalog and manifests
//! - [`config`]: TOML/env/CLI configuration
//! - [`context`]: Per-hook context
//! - [`help`]: Help overlay content and drawing
//! - [`input`]: Logical keys and input sources
//! - [`keyboard`]: Blocking on-screen keyboard
//! - [`mode`]: Input mode state machine
//! - [`scheduler`]: The frame loop
//! - [`surface`]: Drawing surface abstraction
//! - [`tasks`]: Task bridge and executors
//! - [`timing`]: Frame pacing and background tick timing
//!
//! # No Terminal Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework. Hosts provide a [`Surface`] and an [`InputSource`].

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod attention;
pub mod catalog;
pub mod config;
pub mod context;
pub mod help;
pub mod input;
pub mod keyboard;
pub mod mode;
pub mod scheduler;
pub mod surface;
pub mod tasks;
pub mod timing;

// Re-exports for convenience
pub use app::{downcast_mut, downcast_ref, AppFlags, AppId, Application, HelpEntry, HookResult};
pub use attention::{AttentionQueue, AttentionRequest, Priority};
pub use catalog::{AppCatalog, AppDescriptor, AppManifest, CatalogError, StaticCatalog};
pub use context::Context;
pub use help::{build_help_lines, render_help, HelpLayout, HelpLine};
pub use input::{HeadlessInput, InputEvent, InputSource, Key};
pub use keyboard::{show_keyboard, KeyboardMode, KeyboardStatus, OnScreenKeyboard};
pub use mode::{HelpMetrics, ModeRouter, ModeState, Route};
pub use scheduler::{FrameReport, Hook, Scheduler, SchedulerError};
pub use surface::{draw_centered_text, Color, DeviceError, DrawnText, HeadlessSurface, Surface, TextMetrics};
pub use tasks::{
    DeferredExecutor, Delivery, Executor, InlineExecutor, SubmitError, TaskBridge, TaskError,
    TaskId, TaskResult, TaskStats, ThreadExecutor, TokioExecutor,
};
pub use timing::{FramePacer, TickTimer};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env,
    parse_resolution, ColorMode, ConfigError, ConfigOverrides, ConfigSource, DisplayConfig,
    ExecutorKind, FaultPolicy, MatrixOsToml, RuntimeConfig, SchedulerConfig, TaskConfig,
};
