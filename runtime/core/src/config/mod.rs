//! TOML Configuration File Support
//!
//! This module provides centralized configuration loading for the runtime,
//! supporting a TOML configuration file at `~/.config/matrixos/matrixos.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables (`MATRIXOS_*`)
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file follows XDG Base Directory specification:
//! - `$XDG_CONFIG_HOME/matrixos/matrixos.toml` (typically `~/.config/matrixos/matrixos.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [display]
//! resolution = "128x64"      # or width/height
//! color_mode = "rgb"         # "rgb" or "mono"
//!
//! [scheduler]
//! frame_rate = 60
//! background_tick_ms = 1000
//! input_poll_timeout_ms = 1
//! fault_policy = "isolate"   # "isolate" or "fail_fast"
//! allow_background_apps = true
//!
//! [tasks]
//! executor = "tokio"         # "tokio" or "thread"
//! max_in_flight = 0          # 0 = unlimited
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Value Types
// =============================================================================

/// Display color capability
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Full RGB
    #[default]
    Rgb,
    /// Single color; pixels are on or off
    Mono,
}

impl ColorMode {
    /// Parse a color mode name
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "rgb" | "color" | "colour" => Ok(Self::Rgb),
            "mono" | "monochrome" => Ok(Self::Mono),
            other => Err(ConfigError::ValidationError(format!("unknown color mode '{other}'"))),
        }
    }
}

/// What the scheduler does when an application hook fails or panics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Log, mark the application faulted, skip its hooks and keep running
    #[default]
    Isolate,
    /// Stop the scheduler and return the error from `run`
    FailFast,
}

impl FaultPolicy {
    /// Parse a policy name
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "isolate" => Ok(Self::Isolate),
            "fail_fast" | "failfast" => Ok(Self::FailFast),
            other => Err(ConfigError::ValidationError(format!("unknown fault policy '{other}'"))),
        }
    }
}

/// Where background task work runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Shared tokio runtime
    #[default]
    Tokio,
    /// One OS thread per task
    Thread,
}

impl ExecutorKind {
    /// Parse an executor name
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown names.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "tokio" => Ok(Self::Tokio),
            "thread" | "threads" => Ok(Self::Thread),
            other => Err(ConfigError::ValidationError(format!("unknown executor '{other}'"))),
        }
    }
}

/// Parse a `WIDTHxHEIGHT` resolution such as `128x64`
///
/// Panel presets: `64x64`, `128x64`, `128x128`, `256x192`.
///
/// # Errors
///
/// Returns a validation error if the string is malformed or a dimension is 0.
pub fn parse_resolution(s: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::ValidationError(format!("invalid resolution '{s}', expected WIDTHxHEIGHT"));

    let (w, h) = s.trim().to_lowercase().split_once('x').map(|(w, h)| (w.to_string(), h.to_string())).ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Display section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// Width in pixels
    pub width: Option<u32>,

    /// Height in pixels
    pub height: Option<u32>,

    /// `WIDTHxHEIGHT`, applied before `width`/`height`
    pub resolution: Option<String>,

    /// "rgb" or "mono"
    pub color_mode: Option<String>,
}

/// Scheduler section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerToml {
    /// Target frames per second
    pub frame_rate: Option<u32>,

    /// Background tick interval in milliseconds
    pub background_tick_ms: Option<u64>,

    /// Input poll timeout in milliseconds
    pub input_poll_timeout_ms: Option<u64>,

    /// "isolate" or "fail_fast"
    pub fault_policy: Option<String>,

    /// Whether non-foreground applications get background ticks
    pub allow_background_apps: Option<bool>,
}

/// Tasks section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksToml {
    /// "tokio" or "thread"
    pub executor: Option<String>,

    /// Maximum tasks awaiting delivery (0 = unlimited)
    pub max_in_flight: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixOsToml {
    /// Display configuration section
    pub display: DisplayToml,

    /// Scheduler configuration section
    pub scheduler: SchedulerToml,

    /// Tasks configuration section
    pub tasks: TasksToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Display settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Color capability
    pub color_mode: ColorMode,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            color_mode: ColorMode::Rgb,
        }
    }
}

/// Scheduler loop settings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Target frames per second
    pub frame_rate: u32,
    /// Background tick interval
    pub background_tick: Duration,
    /// How long each frame waits for input
    pub input_poll_timeout: Duration,
    /// Reaction to hook faults
    pub fault_policy: FaultPolicy,
    /// Whether non-foreground applications get background ticks
    pub allow_background_apps: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            background_tick: Duration::from_secs(1),
            input_poll_timeout: Duration::from_millis(1),
            fault_policy: FaultPolicy::Isolate,
            allow_background_apps: true,
        }
    }
}

/// Task bridge settings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TaskConfig {
    /// Executor to run work on
    pub executor: ExecutorKind,
    /// Maximum tasks awaiting delivery (0 = unlimited)
    pub max_in_flight: usize,
}

/// Centralized configuration for the runtime
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Display settings
    pub display: DisplayConfig,

    /// Scheduler loop settings
    pub scheduler: SchedulerConfig,

    /// Task bridge settings
    pub tasks: TaskConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            scheduler: SchedulerConfig::default(),
            tasks: TaskConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl RuntimeConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check that values are usable
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::ValidationError(format!(
                "display must be at least 1x1, got {}x{}",
                self.display.width, self.display.height
            )));
        }
        if !(1..=240).contains(&self.scheduler.frame_rate) {
            return Err(ConfigError::ValidationError(format!(
                "frame_rate must be between 1 and 240, got {}",
                self.scheduler.frame_rate
            )));
        }
        if self.scheduler.background_tick.is_zero() {
            return Err(ConfigError::ValidationError(
                "background_tick_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/matrixos/matrixos.toml` or
/// `~/.config/matrixos/matrixos.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("matrixos").join("matrixos.toml"))
}

/// Load configuration from all sources with proper priority
///
/// Priority order (highest first):
/// 1. CLI arguments (not handled here - caller should apply [`ConfigOverrides`] after)
/// 2. Environment variables
/// 3. TOML configuration file
/// 4. Default values
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<RuntimeConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<RuntimeConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a custom environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<E>(path: Option<PathBuf>, env: E) -> Result<RuntimeConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    // Start with defaults
    let mut config = RuntimeConfig::default();

    // Try to load from file
    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: MatrixOsToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Apply environment variables (overrides file values)
    apply_env_config(&mut config, env);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut RuntimeConfig, toml: &MatrixOsToml) -> Result<(), ConfigError> {
    // Display settings
    if let Some(ref resolution) = toml.display.resolution {
        let (width, height) = parse_resolution(resolution)?;
        config.display.width = width;
        config.display.height = height;
    }
    if let Some(width) = toml.display.width {
        config.display.width = width;
    }
    if let Some(height) = toml.display.height {
        config.display.height = height;
    }
    if let Some(ref mode) = toml.display.color_mode {
        config.display.color_mode = ColorMode::parse(mode)?;
    }

    // Scheduler settings
    if let Some(fps) = toml.scheduler.frame_rate {
        config.scheduler.frame_rate = fps;
    }
    if let Some(ms) = toml.scheduler.background_tick_ms {
        config.scheduler.background_tick = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.scheduler.input_poll_timeout_ms {
        config.scheduler.input_poll_timeout = Duration::from_millis(ms);
    }
    if let Some(ref policy) = toml.scheduler.fault_policy {
        config.scheduler.fault_policy = FaultPolicy::parse(policy)?;
    }
    if let Some(allow) = toml.scheduler.allow_background_apps {
        config.scheduler.allow_background_apps = allow;
    }

    // Task settings
    if let Some(ref executor) = toml.tasks.executor {
        config.tasks.executor = ExecutorKind::parse(executor)?;
    }
    if let Some(limit) = toml.tasks.max_in_flight {
        config.tasks.max_in_flight = limit;
    }

    Ok(())
}

/// Apply environment variable overrides to the config
///
/// Unparseable values are logged and ignored.
fn apply_env_config<E>(config: &mut RuntimeConfig, env: E)
where
    E: Fn(&str) -> Option<String>,
{
    // Display settings from environment
    if let Some(resolution) = env("MATRIXOS_RESOLUTION") {
        match parse_resolution(&resolution) {
            Ok((width, height)) => {
                config.display.width = width;
                config.display.height = height;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring MATRIXOS_RESOLUTION"),
        }
    }
    if let Some(width) = env("MATRIXOS_WIDTH") {
        if let Ok(w) = width.parse::<u32>() {
            config.display.width = w;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(height) = env("MATRIXOS_HEIGHT") {
        if let Ok(h) = height.parse::<u32>() {
            config.display.height = h;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(mode) = env("MATRIXOS_COLOR_MODE") {
        match ColorMode::parse(&mode) {
            Ok(mode) => {
                config.display.color_mode = mode;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring MATRIXOS_COLOR_MODE"),
        }
    }

    // Scheduler settings from environment
    if let Some(fps) = env("MATRIXOS_FPS") {
        if let Ok(fps) = fps.parse::<u32>() {
            config.scheduler.frame_rate = fps;
            config.source = ConfigSource::Env;
        }
    }
    if let Some(ms) = env("MATRIXOS_BACKGROUND_TICK_MS") {
        if let Ok(ms) = ms.parse::<u64>() {
            config.scheduler.background_tick = Duration::from_millis(ms);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(policy) = env("MATRIXOS_FAULT_POLICY") {
        match FaultPolicy::parse(&policy) {
            Ok(policy) => {
                config.scheduler.fault_policy = policy;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring MATRIXOS_FAULT_POLICY"),
        }
    }
    if let Some(allow) = env("MATRIXOS_BACKGROUND_APPS") {
        config.scheduler.allow_background_apps = allow != "0" && allow.to_lowercase() != "false";
        config.source = ConfigSource::Env;
    }

    // Task settings from environment
    if let Some(executor) = env("MATRIXOS_EXECUTOR") {
        match ExecutorKind::parse(&executor) {
            Ok(kind) => {
                config.tasks.executor = kind;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring MATRIXOS_EXECUTOR"),
        }
    }
    if let Some(limit) = env("MATRIXOS_MAX_TASKS") {
        if let Ok(n) = limit.parse::<usize>() {
            config.tasks.max_in_flight = n;
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Display size override
    pub resolution: Option<(u32, u32)>,

    /// Width override
    pub width: Option<u32>,

    /// Height override
    pub height: Option<u32>,

    /// Color mode override
    pub color_mode: Option<ColorMode>,

    /// Frame rate override
    pub frame_rate: Option<u32>,

    /// Fault policy override
    pub fault_policy: Option<FaultPolicy>,

    /// Executor override
    pub executor: Option<ExecutorKind>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set resolution override
    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some((width, height));
        self
    }

    /// Set width override
    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    /// Set height override
    #[must_use]
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Set color mode override
    #[must_use]
    pub fn with_color_mode(mut self, mode: ColorMode) -> Self {
        self.color_mode = Some(mode);
        self
    }

    /// Set frame rate override
    #[must_use]
    pub fn with_frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    /// Set fault policy override
    #[must_use]
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = Some(policy);
        self
    }

    /// Set executor override
    #[must_use]
    pub fn with_executor(mut self, executor: ExecutorKind) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut RuntimeConfig) {
        if self.resolution.is_some()
            || self.width.is_some()
            || self.height.is_some()
            || self.color_mode.is_some()
            || self.frame_rate.is_some()
            || self.fault_policy.is_some()
            || self.executor.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        // Explicit width/height win over a resolution preset
        if let Some((width, height)) = self.resolution {
            config.display.width = width;
            config.display.height = height;
        }
        if let Some(width) = self.width {
            config.display.width = width;
        }
        if let Some(height) = self.height {
            config.display.height = height;
        }
        if let Some(mode) = self.color_mode {
            config.display.color_mode = mode;
        }
        if let Some(fps) = self.frame_rate {
            config.scheduler.frame_rate = fps;
        }
        if let Some(policy) = self.fault_policy {
            config.scheduler.fault_policy = policy;
        }
        if let Some(executor) = self.executor {
            config.tasks.executor = executor;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn load(toml: &str) -> Result<RuntimeConfig, ConfigError> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();
        load_config_with_env(Some(file.path().to_path_buf()), no_env)
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();

        assert_eq!(config.display.width, 64);
        assert_eq!(config.display.height, 64);
        assert_eq!(config.display.color_mode, ColorMode::Rgb);
        assert_eq!(config.scheduler.frame_rate, 60);
        assert_eq!(config.scheduler.background_tick, Duration::from_secs(1));
        assert_eq!(config.scheduler.fault_policy, FaultPolicy::Isolate);
        assert!(config.scheduler.allow_background_apps);
        assert_eq!(config.tasks.executor, ExecutorKind::Tokio);
        assert_eq!(config.tasks.max_in_flight, 0);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        // Should return Some path (depends on environment)
        if let Some(p) = path {
            assert!(p.to_string_lossy().contains("matrixos"));
            assert!(p.to_string_lossy().ends_with("matrixos.toml"));
        }
    }

    // =========================================================================
    // TOML Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_valid_toml() {
        let config = load(
            r#"
[display]
resolution = "128x64"
color_mode = "mono"

[scheduler]
frame_rate = 30
background_tick_ms = 500
fault_policy = "fail_fast"
allow_background_apps = false

[tasks]
executor = "thread"
max_in_flight = 8
"#,
        )
        .unwrap();

        assert_eq!((config.display.width, config.display.height), (128, 64));
        assert_eq!(config.display.color_mode, ColorMode::Mono);
        assert_eq!(config.scheduler.frame_rate, 30);
        assert_eq!(config.scheduler.background_tick, Duration::from_millis(500));
        assert_eq!(config.scheduler.fault_policy, FaultPolicy::FailFast);
        assert!(!config.scheduler.allow_background_apps);
        assert_eq!(config.tasks.executor, ExecutorKind::Thread);
        assert_eq!(config.tasks.max_in_flight, 8);
        assert_eq!(config.source(), ConfigSource::File);
        assert!(config.config_file_path.is_some());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = load("[display]\nwidth = 128\n").unwrap();
        assert_eq!(config.display.width, 128);
        assert_eq!(config.display.height, 64);
        assert_eq!(config.scheduler.frame_rate, 60);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(load("[display\nwidth ="), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_value_in_toml() {
        assert!(matches!(
            load("[display]\ncolor_mode = \"sepia\"\n"),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            load_config_with_env(Some(PathBuf::from("/nonexistent/matrixos.toml")), no_env).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    // =========================================================================
    // Environment and CLI Tests
    // =========================================================================

    #[test]
    fn test_env_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[scheduler]\nframe_rate = 30\n").unwrap();

        let vars: HashMap<&str, &str> = [
            ("MATRIXOS_FPS", "90"),
            ("MATRIXOS_RESOLUTION", "256x192"),
            ("MATRIXOS_EXECUTOR", "nonsense"),
        ]
        .into_iter()
        .collect();

        let config = load_config_with_env(Some(file.path().to_path_buf()), |k| {
            vars.get(k).map(|v| (*v).to_string())
        })
        .unwrap();

        assert_eq!(config.scheduler.frame_rate, 90);
        assert_eq!((config.display.width, config.display.height), (256, 192));
        // Bad values are ignored
        assert_eq!(config.tasks.executor, ExecutorKind::Tokio);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = RuntimeConfig::default();
        ConfigOverrides::new()
            .with_resolution(128, 128)
            .with_height(64)
            .with_color_mode(ColorMode::Mono)
            .with_fault_policy(FaultPolicy::FailFast)
            .apply(&mut config);

        assert_eq!((config.display.width, config.display.height), (128, 64));
        assert_eq!(config.display.color_mode, ColorMode::Mono);
        assert_eq!(config.scheduler.fault_policy, FaultPolicy::FailFast);
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = RuntimeConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    // =========================================================================
    // Value Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("64x64").unwrap(), (64, 64));
        assert_eq!(parse_resolution(" 128X64 ").unwrap(), (128, 64));
        assert!(parse_resolution("128").is_err());
        assert!(parse_resolution("0x64").is_err());
        assert!(parse_resolution("axb").is_err());
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!(FaultPolicy::parse("fail-fast").unwrap(), FaultPolicy::FailFast);
        assert_eq!(ColorMode::parse("MONO").unwrap(), ColorMode::Mono);
        assert_eq!(ExecutorKind::parse("threads").unwrap(), ExecutorKind::Thread);
        assert!(FaultPolicy::parse("panic").is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = RuntimeConfig::default();
        config.scheduler.frame_rate = 0;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.display.width = 0;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.scheduler.background_tick = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
