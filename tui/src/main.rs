//! MatrixOS Terminal Entry Point
//!
//! Runs the MatrixOS scheduler with the launcher and built-in apps, using
//! the terminal as the display.
//!
//! # Usage
//!
//! ```bash
//! # 64x64 display with defaults
//! matrixos
//!
//! # Larger display, monochrome
//! matrixos --resolution 128x128 --mono
//!
//! # Custom config file
//! matrixos --config ~/matrixos.toml
//!
//! # Verbose logging (written to the log file, never the screen)
//! RUST_LOG=debug matrixos
//! ```
//!
//! # Keys
//!
//! Arrows navigate, Enter is OK, Backspace is BACK, Esc goes home, Tab
//! toggles help, `q` or Ctrl-C quits.

use std::fs::{self, File};
use std::io::{self, IsTerminal};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{error, info};

use matrixos_core::{
    load_config_from_path, parse_resolution, AppCatalog, ColorMode, ConfigOverrides, ExecutorKind,
    FaultPolicy, RuntimeConfig, Scheduler,
};
use matrixos_tui::apps::{builtin_catalog, OpenMeteo};
use matrixos_tui::{Launcher, TerminalInput, TerminalSurface};

/// MatrixOS - a tiny cooperative OS for pixel displays, in your terminal
#[derive(Parser, Debug)]
#[command(name = "matrixos")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Display size as WIDTHxHEIGHT, e.g. 64x64 or 128x64
    #[arg(short = 'r', long, value_name = "WxH", value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,

    /// Display width in pixels
    #[arg(long, value_name = "PIXELS")]
    width: Option<u32>,

    /// Display height in pixels
    #[arg(long, value_name = "PIXELS")]
    height: Option<u32>,

    /// Monochrome display
    #[arg(long)]
    mono: bool,

    /// Target frame rate
    #[arg(long, value_name = "FPS")]
    fps: Option<u32>,

    /// What to do when an app fails (isolate, fail-fast)
    #[arg(long, value_name = "POLICY", value_parser = FaultPolicy::parse)]
    fault_policy: Option<FaultPolicy>,

    /// Where background tasks run (tokio, thread)
    #[arg(long, value_name = "KIND", value_parser = ExecutorKind::parse)]
    executor: Option<ExecutorKind>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "MATRIXOS_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, env = "MATRIXOS_LOG_FILE", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "MATRIXOS_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    /// CLI values that override the config file and environment
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some((w, h)) = self.resolution {
            overrides = overrides.with_resolution(w, h);
        }
        if let Some(w) = self.width {
            overrides = overrides.with_width(w);
        }
        if let Some(h) = self.height {
            overrides = overrides.with_height(h);
        }
        if self.mono {
            overrides = overrides.with_color_mode(ColorMode::Mono);
        }
        if let Some(fps) = self.fps {
            overrides = overrides.with_frame_rate(fps);
        }
        if let Some(policy) = self.fault_policy {
            overrides = overrides.with_fault_policy(policy);
        }
        if let Some(kind) = self.executor {
            overrides = overrides.with_executor(kind);
        }
        overrides
    }
}

/// Default log file location
///
/// The terminal belongs to the display, so logs go to
/// `$XDG_STATE_HOME/matrixos/matrixos.log` (falling back to the cache dir,
/// then the working directory).
fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .map_or_else(|| PathBuf::from("matrixos.log"), |d| d.join("matrixos").join("matrixos.log"))
}

/// Initialize logging to a file
fn init_logging(level: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {parent:?}"))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create log file: {path:?}"))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("matrixos_core={level},matrixos_tui={level},matrixos={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    Ok(())
}

/// Load config from file and environment, then apply CLI overrides
fn resolve_config(args: &Args) -> Result<RuntimeConfig> {
    let mut config =
        load_config_from_path(args.config.clone()).context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Restores the terminal when dropped, including during unwinding
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        // Guard exists before the screen switch so a failure still restores raw mode
        let guard = Self;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Check if we have a TTY before touching the terminal
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("❌ Error: matrixos requires a terminal (TTY)");
        eprintln!();
        eprintln!("This usually means:");
        eprintln!("  • Running in a non-interactive environment (CI, container)");
        eprintln!("  • SSH without -t flag");
        eprintln!("  • Piped stdin/stdout");
        std::process::exit(1);
    }

    let config = resolve_config(&args)?;
    let log_path = args.log_file.clone().unwrap_or_else(default_log_path);
    init_logging(&args.log_level, &log_path)?;
    info!(
        width = config.display.width,
        height = config.display.height,
        fps = config.scheduler.frame_rate,
        source = %config.source(),
        log = ?log_path,
        "Starting MatrixOS"
    );

    // App panics are caught and isolated by the scheduler, but the default
    // hook would still print over the display
    panic::set_hook(Box::new(|panic_info| {
        error!(panic = %panic_info, "Panic");
    }));

    // Blocking frame loop on this thread; background tasks on the runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("matrixos-task")
        .build()
        .context("Failed to start async runtime")?;
    let _runtime_guard = runtime.enter();

    let result = run(config);

    if let Err(e) = &result {
        error!(error = %e, "MatrixOS stopped with an error");
    }
    info!("MatrixOS exited");
    result
}

/// Set up the terminal and run the scheduler until quit
fn run(config: RuntimeConfig) -> Result<()> {
    let weather = Arc::new(OpenMeteo::new().context("Failed to create HTTP client")?);
    let catalog = builtin_catalog(weather).context("Invalid built-in app manifest")?;
    let launcher = Launcher::new(catalog.list_available());

    let _terminal = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let surface = TerminalSurface::new(
        terminal,
        config.display.width,
        config.display.height,
        config.display.color_mode,
    );
    let mut scheduler = Scheduler::new(config, Box::new(surface), Box::new(TerminalInput::new()))
        .with_catalog(Box::new(catalog));
    scheduler.set_launcher(Box::new(launcher));

    scheduler.run()?;
    Ok(())
}
