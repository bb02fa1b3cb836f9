//! Built-in Applications
//!
//! Everything installed on a fresh device, plus the catalog that lists it.
//! Manifests are embedded from `manifests/` so the binary is self-contained.

pub mod timer;
pub mod weather;

use std::sync::Arc;

use matrixos_core::{CatalogError, StaticCatalog};

pub use timer::{TimerApp, TimerState};
pub use weather::{Condition, Location, OpenMeteo, WeatherApp, WeatherReport, WeatherSource};

/// Catalog ID of the timer
pub const TIMER_ID: &str = "timer";

/// Catalog ID of the weather app
pub const WEATHER_ID: &str = "weather";

const TIMER_MANIFEST: &str = include_str!("../../manifests/timer.json");
const WEATHER_MANIFEST: &str = include_str!("../../manifests/weather.json");

/// Catalog of the built-in apps, fetching live weather from `weather`
///
/// # Errors
///
/// Returns an error if an embedded manifest is invalid.
pub fn builtin_catalog(weather: Arc<dyn WeatherSource>) -> Result<StaticCatalog, CatalogError> {
    let mut catalog = StaticCatalog::new();
    catalog.register_json(TIMER_ID, TIMER_MANIFEST, || Ok(Box::new(TimerApp::new())))?;
    catalog.register_json(WEATHER_ID, WEATHER_MANIFEST, move || {
        Ok(Box::new(WeatherApp::new(Arc::clone(&weather))))
    })?;
    Ok(catalog)
}
