//! Built-in App Tests
//!
//! The launcher, timer and weather apps running inside a real scheduler with
//! a headless display, scripted input and a deferred executor:
//! - Launching from the home grid and reusing running instances
//! - Timer countdown in foreground and background, alarm takeover
//! - Weather fetch, demo fallback, storm attention and city change

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use pretty_assertions::assert_eq;

use matrixos_core::{
    AppCatalog, AppId, Application, DeferredExecutor, HeadlessInput, HeadlessSurface, Key,
    RuntimeConfig, Scheduler, TaskBridge,
};
use matrixos_tui::apps::{
    builtin_catalog, Condition, Location, TimerApp, TimerState, WeatherApp, WeatherReport,
    WeatherSource,
};
use matrixos_tui::Launcher;

// =============================================================================
// Test Infrastructure
// =============================================================================

const FRAME: Duration = Duration::from_millis(16);

/// Weather source that replays queued results
#[derive(Default)]
struct ScriptedWeather {
    reports: Mutex<VecDeque<anyhow::Result<WeatherReport>>>,
    fetched_for: Mutex<Vec<String>>,
    geocoded: Mutex<Vec<String>>,
}

impl ScriptedWeather {
    fn push(&self, temperature: i32, condition: Condition) {
        self.reports
            .lock()
            .unwrap()
            .push_back(Ok(WeatherReport { temperature, condition }));
    }

    fn push_error(&self, message: &'static str) {
        self.reports.lock().unwrap().push_back(Err(anyhow::anyhow!(message)));
    }

    fn fetched_for(&self) -> Vec<String> {
        self.fetched_for.lock().unwrap().clone()
    }
}

impl WeatherSource for ScriptedWeather {
    fn current(&self, location: &Location) -> BoxFuture<'static, anyhow::Result<WeatherReport>> {
        self.fetched_for.lock().unwrap().push(location.name.clone());
        let next = self
            .reports
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted report")));
        Box::pin(async move { next })
    }

    fn geocode(&self, query: &str) -> BoxFuture<'static, anyhow::Result<Location>> {
        self.geocoded.lock().unwrap().push(query.to_string());
        let result = if query == "Atlantis" {
            Err(anyhow::anyhow!("City not found: {query}"))
        } else {
            Ok(Location {
                name: format!("{query}, Norway"),
                latitude: 59.91,
                longitude: 10.75,
            })
        };
        Box::pin(async move { result })
    }
}

struct Harness {
    scheduler: Scheduler,
    surface: HeadlessSurface,
    input: HeadlessInput,
    deferred: DeferredExecutor,
    weather: Arc<ScriptedWeather>,
    now: Instant,
}

impl Harness {
    fn new() -> Self {
        let surface = HeadlessSurface::new(64, 64);
        let input = HeadlessInput::new();
        let deferred = DeferredExecutor::new();
        let weather = Arc::new(ScriptedWeather::default());
        let catalog = builtin_catalog(weather.clone()).unwrap();
        let launcher = Launcher::new(catalog.list_available());

        let mut scheduler = Scheduler::new(
            RuntimeConfig::default(),
            Box::new(surface.clone()),
            Box::new(input.clone()),
        )
        .with_task_bridge(TaskBridge::new(Arc::new(deferred.clone())))
        .with_catalog(Box::new(catalog));
        scheduler.set_launcher(Box::new(launcher));

        Self {
            scheduler,
            surface,
            input,
            deferred,
            weather,
            now: Instant::now(),
        }
    }

    fn frame(&mut self) -> matrixos_core::FrameReport {
        let report = self.scheduler.run_frame(self.now).unwrap();
        self.now += FRAME;
        report
    }

    fn press(&mut self, key: Key) -> matrixos_core::FrameReport {
        self.input.push(key);
        self.frame()
    }

    /// Let `duration` pass before the next frame
    fn wait(&mut self, duration: Duration) -> matrixos_core::FrameReport {
        self.now += duration;
        self.frame()
    }

    /// Complete every queued task and deliver the results
    fn settle_tasks(&mut self) -> matrixos_core::FrameReport {
        self.deferred.run_all();
        self.frame()
    }

    fn go_home(&mut self) {
        let launcher = self.scheduler.launcher().unwrap();
        self.scheduler.switch_to(launcher).unwrap();
        self.frame();
    }

    fn start_app<A: Application>(&mut self, app: A) -> AppId {
        let id = self.scheduler.register(Box::new(app));
        self.scheduler.switch_to(id).unwrap();
        self.frame();
        id
    }

    fn timer(&self, id: AppId) -> &TimerApp {
        self.scheduler.app::<TimerApp>(id).unwrap()
    }

    fn weather_app(&self, id: AppId) -> &WeatherApp {
        self.scheduler.app::<WeatherApp>(id).unwrap()
    }

    fn shows(&self, text: &str) -> bool {
        self.surface.presented_text().iter().any(|t| t.contains(text))
    }
}

// =============================================================================
// Launcher
// =============================================================================

#[test]
fn test_launcher_lists_builtin_apps() {
    let mut h = Harness::new();
    h.go_home();

    assert!(h.shows("TIMER"));
    assert!(h.shows("T"));
    assert!(h.shows("W"));
}

#[test]
fn test_launcher_launches_selected_app() {
    let mut h = Harness::new();
    h.go_home();

    h.press(Key::Right);
    assert!(h.shows("WEATHER"));
    h.press(Key::Ok);

    let active = h.scheduler.active().unwrap();
    assert!(h.scheduler.app::<WeatherApp>(active).is_some());
}

#[test]
fn test_launcher_reuses_running_instance() {
    let mut h = Harness::new();
    h.go_home();

    h.press(Key::Ok);
    let first = h.scheduler.active().unwrap();
    assert!(h.scheduler.app::<TimerApp>(first).is_some());

    h.press(Key::Home);
    assert_eq!(h.scheduler.active(), h.scheduler.launcher());
    h.press(Key::Ok);

    assert_eq!(h.scheduler.active(), Some(first));
    // Launcher plus one timer
    assert_eq!(h.scheduler.app_ids().len(), 2);
}

#[test]
fn test_back_on_launcher_stays_home() {
    let mut h = Harness::new();
    h.go_home();
    h.press(Key::Back);

    assert_eq!(h.scheduler.active(), h.scheduler.launcher());
    assert!(h.scheduler.is_running());
}

// =============================================================================
// Timer
// =============================================================================

#[test]
fn test_timer_presets_wrap() {
    let mut h = Harness::new();
    let timer = h.start_app(TimerApp::new());
    assert_eq!(h.timer(timer).selected_seconds(), 10);

    h.press(Key::Up);
    assert_eq!(h.timer(timer).selected_seconds(), 5);
    h.press(Key::Up);
    assert_eq!(h.timer(timer).selected_seconds(), 60);
    h.press(Key::Down);
    assert_eq!(h.timer(timer).selected_seconds(), 5);
    assert!(h.shows("> 5s <"));
}

#[test]
fn test_timer_counts_down_in_foreground() {
    let mut h = Harness::new();
    let timer = h.start_app(TimerApp::new());

    h.press(Key::Ok);
    assert_eq!(h.timer(timer).state(), TimerState::Running);
    assert!(h.shows("RUNNING"));

    h.wait(Duration::from_secs(4));
    assert!(h.timer(timer).remaining() < Duration::from_secs(6));
    assert!(h.timer(timer).remaining() > Duration::from_secs(5));

    h.wait(Duration::from_secs(6));
    assert_eq!(h.timer(timer).state(), TimerState::Alarm);
    assert!(h.shows("TIME'S"));
    assert!(h.shows("PRESS ANY KEY"));
}

#[test]
fn test_timer_any_key_dismisses_alarm() {
    let mut h = Harness::new();
    let timer = h.start_app(TimerApp::new());
    h.press(Key::Ok);
    h.wait(Duration::from_secs(11));
    assert_eq!(h.timer(timer).state(), TimerState::Alarm);

    // BACK is consumed by the alarm instead of going home
    h.press(Key::Back);
    assert_eq!(h.timer(timer).state(), TimerState::Setting);
    assert_eq!(h.scheduler.active(), Some(timer));
}

#[test]
fn test_timer_pause_and_cancel() {
    let mut h = Harness::new();
    let timer = h.start_app(TimerApp::new());
    h.press(Key::Ok);

    h.press(Key::Char(' '));
    assert_eq!(h.timer(timer).state(), TimerState::Paused);
    assert!(h.shows("PAUSED"));
    let held = h.timer(timer).remaining();

    h.wait(Duration::from_secs(5));
    assert_eq!(h.timer(timer).remaining(), held);

    h.press(Key::Ok);
    assert_eq!(h.timer(timer).state(), TimerState::Running);

    h.press(Key::Char('c'));
    assert_eq!(h.timer(timer).state(), TimerState::Setting);
    assert!(h.shows("ENTER=START"));
}

#[test]
fn test_timer_alarm_takes_over_from_background() {
    let mut h = Harness::new();
    let timer = h.start_app(TimerApp::new());
    h.press(Key::Ok);
    h.press(Key::Home);
    assert_eq!(h.scheduler.active(), h.scheduler.launcher());

    let mut took_over_after = None;
    for tick in 1..=15 {
        h.wait(Duration::from_secs(1));
        if h.scheduler.active() == Some(timer) {
            took_over_after = Some(tick);
            break;
        }
    }

    // Ten one-second ticks, then the switch on the same or next frame
    let ticks = took_over_after.expect("timer never took the screen");
    assert!((10..=11).contains(&ticks), "took over after {ticks} ticks");
    assert_eq!(h.timer(timer).state(), TimerState::Alarm);
    assert!(h.shows("TIME'S"));
}

#[test]
fn test_timer_seen_alarm_resets_on_return() {
    let mut h = Harness::new();
    let timer = h.start_app(TimerApp::new());
    h.press(Key::Ok);
    h.wait(Duration::from_secs(11));
    assert!(h.shows("TIME'S"));

    h.press(Key::Home);
    h.scheduler.switch_to(timer).unwrap();
    h.frame();

    assert_eq!(h.timer(timer).state(), TimerState::Setting);
}

#[test]
fn test_timer_help_follows_state() {
    let keys = |app: &TimerApp| app.help_entries().into_iter().map(|e| e.key).collect::<Vec<_>>();
    let app = TimerApp::new();
    assert_eq!(keys(&app), vec!["↑↓", "ENTER"]);

    let mut h = Harness::new();
    let timer = h.start_app(app);
    h.press(Key::Ok);
    assert_eq!(keys(h.timer(timer)), vec!["SPC", "C"]);

    h.wait(Duration::from_secs(11));
    assert_eq!(keys(h.timer(timer)), vec!["ANY"]);
}

// =============================================================================
// Weather
// =============================================================================

fn weather_app(h: &Harness) -> WeatherApp {
    WeatherApp::new(h.weather.clone())
}

#[test]
fn test_weather_fetches_on_activate() {
    let mut h = Harness::new();
    h.weather.push(11, Condition::Rainy);
    let app = weather_app(&h);
    let weather = h.start_app(app);

    assert!(h.weather_app(weather).is_loading());
    assert!(h.shows("LOADING..."));

    h.settle_tasks();
    let app = h.weather_app(weather);
    assert!(!app.is_loading());
    assert_eq!(app.update_count(), 1);
    assert_eq!(app.report().temperature, 11);
    assert!(h.shows("11C"));
    assert!(h.shows("RAINY"));
    assert_eq!(h.weather.fetched_for(), vec!["Cardiff, UK"]);
}

#[test]
fn test_weather_ignores_refresh_while_loading() {
    let mut h = Harness::new();
    let app = weather_app(&h);
    let weather = h.start_app(app);

    h.press(Key::Char('r'));
    h.press(Key::Char('R'));

    assert_eq!(h.deferred.pending(), 1);
    assert!(h.weather_app(weather).is_loading());
}

#[test]
fn test_weather_failure_switches_to_demo() {
    let mut h = Harness::new();
    h.weather.push_error("connection refused");
    let app = weather_app(&h);
    let weather = h.start_app(app);

    h.settle_tasks();
    assert!(h.weather_app(weather).is_demo());
    assert_eq!(h.weather_app(weather).update_count(), 0);

    // Demo data is generated without touching the source
    h.press(Key::Char('r'));
    h.settle_tasks();
    let app = h.weather_app(weather);
    assert_eq!(app.update_count(), 1);
    assert!((8..=18).contains(&app.report().temperature));
    assert_eq!(h.weather.fetched_for().len(), 1);
}

#[test]
fn test_storm_in_background_requests_attention() {
    let mut h = Harness::new();
    h.weather.push(15, Condition::Cloudy);
    h.weather.push(9, Condition::Stormy);
    let app = weather_app(&h).with_fetch_interval(Duration::ZERO);
    let weather = h.start_app(app);
    h.settle_tasks();

    h.go_home();
    // Tick fires once the second has passed
    let report = h.wait(Duration::from_secs(1));
    assert_eq!(report.background_ticks, 1);
    assert_eq!(h.deferred.pending(), 1);

    h.deferred.run_all();
    h.frame();
    h.frame();

    assert_eq!(h.scheduler.active(), Some(weather));
    assert_eq!(h.weather_app(weather).report().condition, Condition::Stormy);
}

#[test]
fn test_calm_weather_in_background_stays_quiet() {
    let mut h = Harness::new();
    h.weather.push(15, Condition::Cloudy);
    h.weather.push(12, Condition::Rainy);
    let app = weather_app(&h).with_fetch_interval(Duration::ZERO);
    let weather = h.start_app(app);
    h.settle_tasks();

    h.go_home();
    h.wait(Duration::from_secs(1));
    h.settle_tasks();
    h.frame();

    assert_eq!(h.weather_app(weather).report().condition, Condition::Rainy);
    assert_eq!(h.scheduler.active(), h.scheduler.launcher());
    assert_eq!(h.scheduler.pending_attention(), 0);
}

#[test]
fn test_weather_background_refresh_respects_interval() {
    let mut h = Harness::new();
    h.weather.push(15, Condition::Cloudy);
    let app = weather_app(&h);
    let weather = h.start_app(app);
    h.settle_tasks();

    h.go_home();
    for _ in 0..3 {
        h.wait(Duration::from_secs(1));
    }

    // Five minute interval measured on the wall clock: nothing new yet
    assert_eq!(h.deferred.pending(), 0);
    assert_eq!(h.weather_app(weather).update_count(), 1);
}

#[test]
fn test_weather_change_city() {
    let mut h = Harness::new();
    h.weather.push(15, Condition::Cloudy);
    h.weather.push(3, Condition::Sunny);
    let app = weather_app(&h).with_location(Location {
        name: String::new(),
        latitude: 51.48,
        longitude: -3.18,
    });
    let weather = h.start_app(app);
    h.settle_tasks();

    // 'c' opens the keyboard; the rest of the queue is typed into it
    h.input.push(Key::Char('c'));
    h.input.type_text("Oslo");
    h.input.push(Key::Up);
    h.input.push(Key::Left);
    h.input.push(Key::Ok);
    h.frame();
    assert_eq!(h.input.pending(), 0);
    assert_eq!(*h.weather.geocoded.lock().unwrap(), vec!["Oslo"]);

    // Geocode result triggers a fetch for the new place
    h.settle_tasks();
    assert_eq!(h.weather_app(weather).location().name, "Oslo, Norway");
    h.settle_tasks();

    let app = h.weather_app(weather);
    assert_eq!(app.report().temperature, 3);
    assert_eq!(h.weather.fetched_for(), vec!["", "Oslo, Norway"]);
    assert!(h.shows("OSLO, NORWAY"));
}

#[test]
fn test_weather_unknown_city_keeps_location() {
    let mut h = Harness::new();
    h.weather.push(15, Condition::Cloudy);
    let app = weather_app(&h).with_location(Location {
        name: String::new(),
        latitude: 51.48,
        longitude: -3.18,
    });
    let weather = h.start_app(app);
    h.settle_tasks();

    h.input.push(Key::Char('c'));
    h.input.type_text("Atlantis");
    h.input.push(Key::Up);
    h.input.push(Key::Left);
    h.input.push(Key::Ok);
    h.frame();
    h.settle_tasks();

    assert_eq!(h.weather_app(weather).location().name, "");
    assert_eq!(h.deferred.pending(), 0);
    assert!(h.scheduler.fault(weather).is_none());
}

#[test]
fn test_cancelled_city_entry_changes_nothing() {
    let mut h = Harness::new();
    h.weather.push(15, Condition::Cloudy);
    let app = weather_app(&h);
    let weather = h.start_app(app);
    h.settle_tasks();

    h.input.push(Key::Char('c'));
    h.input.type_text("Rome");
    h.input.push(Key::Back);
    h.frame();

    assert!(h.weather.geocoded.lock().unwrap().is_empty());
    assert_eq!(h.weather_app(weather).location().name, "Cardiff, UK");
    assert_eq!(h.scheduler.active(), Some(weather));
}
