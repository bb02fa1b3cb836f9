//! Weather
//!
//! Current conditions for one city, refreshed from the background tick
//! every few minutes through the task bridge.
//!
//! # Data Flow
//!
//! ```text
//!   on_activate / tick / 'R'                       frame loop
//!          │                                            ▲
//!          ▼                                            │ on_report
//!   WeatherSource::current ──► executor ──► TaskBridge ─┘
//! ```
//!
//! If the live source fails once, the app switches to generated demo data
//! for the rest of the session. A change to stormy weather while the app is
//! in the background asks for the screen at normal priority.
//!
//! 'C' opens the on-screen keyboard; the entered name is geocoded and the
//! weather refetched for the new location.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use matrixos_core::{
    draw_centered_text, show_keyboard, Application, Color, Context, HelpEntry, HookResult, InputEvent,
    InputSource, Key, Priority, Surface, TaskId, TaskResult,
};
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

use crate::draw::{self, to_i32};
use crate::theme;

/// Default refresh cadence
pub const FETCH_INTERVAL: Duration = Duration::from_secs(300);

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const USER_AGENT: &str = "MatrixOS/1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Conditions
// ============================================================================

/// Simplified weather condition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Clear or mainly clear
    Sunny,
    /// Cloud cover, fog and anything unrecognised
    Cloudy,
    /// Drizzle, rain and showers
    Rainy,
    /// Thunderstorms
    Stormy,
}

impl Condition {
    /// Map a WMO weather interpretation code
    #[must_use]
    pub fn from_wmo(code: u16) -> Self {
        match code {
            0 | 1 => Self::Sunny,
            51 | 53 | 55 | 61 | 63 | 65 | 80 | 81 | 82 => Self::Rainy,
            95 | 96 | 99 => Self::Stormy,
            _ => Self::Cloudy,
        }
    }

    /// Icon and label color
    #[must_use]
    pub fn color(self) -> Color {
        match self {
            Self::Sunny => Color::rgb(255, 255, 0),
            Self::Cloudy => Color::rgb(150, 150, 150),
            Self::Rainy => Color::rgb(100, 100, 255),
            Self::Stormy => Color::rgb(128, 0, 128),
        }
    }

    /// Upper-case label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sunny => "SUNNY",
            Self::Cloudy => "CLOUDY",
            Self::Rainy => "RAINY",
            Self::Stormy => "STORMY",
        }
    }
}

/// One observation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeatherReport {
    /// Degrees Celsius
    pub temperature: i32,
    /// Condition
    pub condition: Condition,
}

/// A named place
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    /// Display name, e.g. "Cardiff, UK"
    pub name: String,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            name: "Cardiff, UK".to_string(),
            latitude: 51.48,
            longitude: -3.18,
        }
    }
}

/// Random report for demo mode
///
/// Weighted towards rain: rainy 4, cloudy 3, sunny 2, stormy 1.
pub fn demo_report<R: Rng + ?Sized>(rng: &mut R) -> WeatherReport {
    const WEIGHTED: [Condition; 10] = [
        Condition::Rainy,
        Condition::Rainy,
        Condition::Rainy,
        Condition::Rainy,
        Condition::Cloudy,
        Condition::Cloudy,
        Condition::Cloudy,
        Condition::Sunny,
        Condition::Sunny,
        Condition::Stormy,
    ];
    WeatherReport {
        temperature: rng.gen_range(8..=18),
        condition: WEIGHTED[rng.gen_range(0..WEIGHTED.len())],
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Errors from weather sources
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Geocoding found nothing
    #[error("City not found: {0}")]
    CityNotFound(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Where weather data comes from
///
/// Both calls return `'static` futures so they can run on any executor.
pub trait WeatherSource: Send + Sync {
    /// Current conditions at `location`
    fn current(&self, location: &Location) -> BoxFuture<'static, anyhow::Result<WeatherReport>>;

    /// Resolve a city name to a location
    fn geocode(&self, query: &str) -> BoxFuture<'static, anyhow::Result<Location>>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default = "default_temperature")]
    temperature_2m: f64,
    #[serde(default)]
    weathercode: u16,
}

impl Default for CurrentWeather {
    fn default() -> Self {
        Self {
            temperature_2m: default_temperature(),
            weathercode: 0,
        }
    }
}

fn default_temperature() -> f64 {
    20.0
}

impl From<ForecastResponse> for WeatherReport {
    fn from(response: ForecastResponse) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let temperature = response.current.temperature_2m.trunc() as i32;
        Self {
            temperature,
            condition: Condition::from_wmo(response.current.weathercode),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeHit>,
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    name: String,
    #[serde(default)]
    country: String,
    latitude: f64,
    longitude: f64,
}

impl GeocodeResponse {
    fn into_location(self, query: &str) -> Result<Location, WeatherError> {
        let hit = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::CityNotFound(query.to_string()))?;
        let name = if hit.country.is_empty() {
            hit.name
        } else {
            format!("{}, {}", hit.name, hit.country)
        };
        Ok(Location {
            name,
            latitude: hit.latitude,
            longitude: hit.longitude,
        })
    }
}

/// Open-Meteo forecast and geocoding APIs (no key required)
#[derive(Clone, Debug)]
pub struct OpenMeteo {
    client: reqwest::Client,
}

impl OpenMeteo {
    /// Build a client with the MatrixOS user agent and a 10s timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl WeatherSource for OpenMeteo {
    fn current(&self, location: &Location) -> BoxFuture<'static, anyhow::Result<WeatherReport>> {
        let request = self.client.get(FORECAST_URL).query(&[
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("current", "temperature_2m,weathercode".to_string()),
            ("timezone", "auto".to_string()),
        ]);
        Box::pin(async move {
            let response: ForecastResponse = request.send().await?.error_for_status()?.json().await?;
            Ok(response.into())
        })
    }

    fn geocode(&self, query: &str) -> BoxFuture<'static, anyhow::Result<Location>> {
        let query = query.to_string();
        let request = self.client.get(GEOCODING_URL).query(&[
            ("name", query.as_str()),
            ("count", "1"),
            ("language", "en"),
            ("format", "json"),
        ]);
        Box::pin(async move {
            let response: GeocodeResponse = request.send().await?.error_for_status()?.json().await?;
            Ok(response.into_location(&query)?)
        })
    }
}

// ============================================================================
// Application
// ============================================================================

/// Weather application
pub struct WeatherApp {
    source: Arc<dyn WeatherSource>,
    location: Location,
    report: WeatherReport,
    fetch_interval: Duration,
    last_fetch: Option<Instant>,
    fetch_task: Option<TaskId>,
    demo_mode: bool,
    update_count: u32,
    /// "Ns ago" label at the last render
    shown_age: Option<String>,
}

impl WeatherApp {
    /// Weather for the default city from `source`
    pub fn new(source: Arc<dyn WeatherSource>) -> Self {
        Self {
            source,
            location: Location::default(),
            report: WeatherReport {
                temperature: 20,
                condition: Condition::Sunny,
            },
            fetch_interval: FETCH_INTERVAL,
            last_fetch: None,
            fetch_task: None,
            demo_mode: false,
            update_count: 0,
            shown_age: None,
        }
    }

    /// Override the refresh cadence
    #[must_use]
    pub fn with_fetch_interval(mut self, interval: Duration) -> Self {
        self.fetch_interval = interval;
        self
    }

    /// Start at a specific location
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Current location
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Latest report
    #[must_use]
    pub fn report(&self) -> WeatherReport {
        self.report
    }

    /// A fetch is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.fetch_task.is_some()
    }

    /// The live source failed and generated data is shown instead
    #[must_use]
    pub fn is_demo(&self) -> bool {
        self.demo_mode
    }

    /// Reports received so far
    #[must_use]
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    fn fetch_due(&self) -> bool {
        match self.last_fetch {
            None => true,
            Some(at) => at.elapsed() >= self.fetch_interval,
        }
    }

    fn fetch(&mut self, cx: &mut Context<'_>) {
        if self.is_loading() {
            return;
        }
        self.last_fetch = Some(Instant::now());

        let submitted = if self.demo_mode {
            cx.submit(|| Ok(demo_report(&mut rand::thread_rng())), Self::on_report)
        } else {
            cx.submit_async(self.source.current(&self.location), Self::on_report)
        };

        match submitted {
            Ok(id) => {
                tracing::debug!(task = %id, city = %self.location.name, demo = self.demo_mode, "Weather fetch started");
                self.fetch_task = Some(id);
            }
            Err(e) => tracing::warn!(error = %e, "Weather fetch not submitted"),
        }
        cx.mark_dirty();
    }

    fn on_report(&mut self, cx: &mut Context<'_>, result: TaskResult<WeatherReport>) -> HookResult {
        self.fetch_task = None;
        cx.mark_dirty();

        match result {
            Ok(report) => {
                let previous = self.report.condition;
                self.report = report;
                self.update_count += 1;
                tracing::debug!(temperature = report.temperature, condition = report.condition.label(), "Weather updated");

                if previous != report.condition && report.condition == Condition::Stormy && !cx.is_active() {
                    cx.request_attention(Priority::Normal);
                }
            }
            Err(e) => {
                if !self.demo_mode {
                    tracing::warn!(error = %e, "Weather fetch failed, switching to demo data");
                    self.demo_mode = true;
                }
            }
        }
        Ok(())
    }

    fn geocode(&mut self, cx: &mut Context<'_>, city: &str) {
        match cx.submit_async(self.source.geocode(city), Self::on_geocoded) {
            Ok(id) => tracing::debug!(task = %id, city, "Geocoding"),
            Err(e) => tracing::warn!(error = %e, "Geocoding not submitted"),
        }
    }

    fn on_geocoded(&mut self, cx: &mut Context<'_>, result: TaskResult<Location>) -> HookResult {
        match result {
            Ok(location) => {
                tracing::info!(city = %location.name, "Weather location changed");
                self.location = location;
                // Results for the old city are no longer wanted
                if let Some(id) = self.fetch_task.take() {
                    cx.cancel_task(id);
                }
                self.fetch(cx);
            }
            Err(e) => tracing::warn!(error = %e, "Geocoding failed"),
        }
        cx.mark_dirty();
        Ok(())
    }

    fn age_label(&self) -> String {
        let secs = self.last_fetch.map_or(0, |at| at.elapsed().as_secs());
        if secs >= 60 {
            format!("{}m ago", secs / 60)
        } else {
            format!("{secs}s ago")
        }
    }

    fn render_icon(&self, surface: &mut dyn Surface, cx: i32, cy: i32, scale: i32) {
        let color = self.report.condition.color();
        let s = |v: i32| v * scale;

        match self.report.condition {
            Condition::Sunny => {
                draw::filled_circle(surface, cx, cy, s(8), color);
                for (dx, dy) in [(1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1), (1, -1)] {
                    // Diagonal steps are ~1.4px long
                    let (inner, outer) = if dx != 0 && dy != 0 { (s(7), s(10)) } else { (s(10), s(14)) };
                    draw::line(
                        surface,
                        (cx + dx * inner, cy + dy * inner),
                        (cx + dx * outer, cy + dy * outer),
                        color,
                    );
                }
            }
            Condition::Cloudy => {
                draw::filled_circle(surface, cx - s(4), cy, s(4), color);
                draw::filled_circle(surface, cx, cy - s(2), s(5), color);
                draw::filled_circle(surface, cx + s(4), cy, s(4), color);
                surface.fill(cx - s(8), cy, draw::to_u32(s(16)), draw::to_u32(s(4)), color);
            }
            Condition::Rainy | Condition::Stormy => {
                let cloud = if self.report.condition == Condition::Rainy {
                    Color::rgb(150, 150, 150)
                } else {
                    Color::rgb(100, 100, 100)
                };
                draw::filled_circle(surface, cx - s(3), cy - s(4), s(3), cloud);
                draw::filled_circle(surface, cx, cy - s(6), s(4), cloud);
                draw::filled_circle(surface, cx + s(3), cy - s(4), s(3), cloud);

                if self.report.condition == Condition::Rainy {
                    for i in 0..s(3) {
                        let x = cx - s(4) + i * (s(4) / 3).max(1);
                        draw::line(surface, (x, cy + s(2)), (x, cy + s(6)), color);
                    }
                } else {
                    let bolt = theme::SELECT_YELLOW;
                    draw::line(surface, (cx, cy), (cx - s(2), cy + s(4)), bolt);
                    draw::line(surface, (cx - s(2), cy + s(4)), (cx + s(1), cy + s(4)), bolt);
                    draw::line(surface, (cx + s(1), cy + s(4)), (cx - s(1), cy + s(8)), bolt);
                }
            }
        }
    }
}

impl Application for WeatherApp {
    fn name(&self) -> &str {
        "Weather"
    }

    fn help_entries(&self) -> Vec<HelpEntry> {
        vec![HelpEntry::new("R", "Refresh"), HelpEntry::new("C", "Change city")]
    }

    fn on_activate(&mut self, cx: &mut Context<'_>) -> HookResult {
        self.fetch(cx);
        Ok(())
    }

    fn on_update(&mut self, cx: &mut Context<'_>, _delta: Duration) -> HookResult {
        if !self.is_loading() && self.shown_age.as_deref() != Some(self.age_label().as_str()) {
            cx.mark_dirty();
        }
        Ok(())
    }

    fn on_background_tick(&mut self, cx: &mut Context<'_>) -> HookResult {
        if self.fetch_due() {
            self.fetch(cx);
        }
        Ok(())
    }

    fn on_event(&mut self, cx: &mut Context<'_>, event: &InputEvent) -> HookResult<bool> {
        match event.key {
            Key::Char('r' | 'R') => {
                self.fetch(cx);
                Ok(true)
            }
            Key::Char('c' | 'C') => {
                cx.request_text_input();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn capture_text(
        &mut self,
        cx: &mut Context<'_>,
        surface: &mut dyn Surface,
        input: &mut dyn InputSource,
    ) -> HookResult {
        let entered = show_keyboard(surface, input, "Enter city:", &self.location.name)?;
        match entered {
            Some(city) if !city.trim().is_empty() && city != self.location.name => {
                self.geocode(cx, city.trim());
            }
            _ => tracing::debug!("City unchanged"),
        }
        Ok(())
    }

    fn render(&mut self, _cx: &mut Context<'_>, surface: &mut dyn Surface) -> HookResult {
        let width = surface.width();
        let height = to_i32(surface.height());

        surface.draw_text(2, 2, "WEATHER", theme::TITLE_CYAN);
        surface.draw_text(2, 10, &self.location.name.to_uppercase(), theme::DIM_GRAY);

        if self.is_loading() {
            draw_centered_text(surface, height / 2, "LOADING...", theme::HINT_GRAY);
            self.shown_age = None;
            return Ok(());
        }

        let scale = to_i32(draw::icon_size(width) / 16);
        let icon_y = if width < 100 { 20 } else { 30 };
        self.render_icon(surface, to_i32(width / 2), icon_y, scale);

        let temp_y = height / 2 + 8 * scale;
        draw_centered_text(surface, temp_y, &format!("{}C", self.report.temperature), theme::TEXT_WHITE);
        draw_centered_text(surface, temp_y + 10, self.report.condition.label(), self.report.condition.color());

        let age = self.age_label();
        draw_centered_text(surface, height - 10, &age, theme::FAINT_GRAY);
        self.shown_age = Some(age);
        Ok(())
    }
}
