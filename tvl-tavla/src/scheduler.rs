//! The refresh scheduler: decides what to fetch on each tick, keeps the
//! last known good value per source, and gates the whole cycle behind
//! night mode.

use chrono::prelude::*;
use chrono::Duration;
use log::*;
use tvl_feeds::FeedResult;
use tvl_feeds::transit::DepartureBatch;
use tvl_feeds::calendar::CalendarEvent;
use tvl_feeds::weather::WeatherSnapshot;
use tvl_feeds::media::MediaStatus;
use tvl_util::time::in_hour_window;

use crate::board;
use crate::week;
use crate::config::Config;
use crate::render::RenderTrigger;
use crate::types::{self, ViewModel};

/// Default weather refresh interval, in seconds.
static WEATHER_INTERVAL: u64 = 300;
/// Default calendar refresh interval, in seconds.
static CALENDAR_INTERVAL: u64 = 3600;
/// Default night mode window, local hours.
static NIGHT_START: u32 = 3;
static NIGHT_END: u32 = 5;
/// Default night mode sleep quantum, in seconds.
pub static NIGHT_SLEEP_SECS: u64 = 300;
/// Default departures lookahead, in minutes.
static TIME_WINDOW: u32 = 180;

/// Last known good state for one source.
///
/// Only a successful fetch moves `last_fetch` or the value. A stale
/// value beats no value, so nothing ever clears one mid-run.
pub struct SourceCache<T> {
    value: Option<T>,
    last_fetch: Option<DateTime<Local>>,
    interval: Duration,
}

impl<T> SourceCache<T> {
    pub fn new(interval_secs: u64) -> Self {
        Self {
            value: None,
            last_fetch: None,
            interval: Duration::seconds(interval_secs as i64),
        }
    }
    /// Whether this source should be fetched this tick.
    pub fn due(&self, now: &DateTime<Local>) -> bool {
        match self.last_fetch {
            Some(at) => now.signed_duration_since(at) > self.interval,
            None => true,
        }
    }
    pub fn store(&mut self, now: &DateTime<Local>, value: T) {
        self.value = Some(value);
        self.last_fetch = Some(*now);
    }
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

/// The transit feed, behind a trait so ticks can be driven with stubs.
pub trait TransitFeed {
    fn fetch_departures(&mut self, stop_area_gid: &str, window_minutes: u32) -> FeedResult<DepartureBatch>;
}

pub trait CalendarFeed {
    fn fetch_events(&mut self) -> FeedResult<Vec<CalendarEvent>>;
}

pub trait WeatherFeed {
    fn fetch_snapshot(&mut self) -> FeedResult<WeatherSnapshot>;
}

pub trait MediaFeed {
    fn fetch_status(&mut self) -> FeedResult<Option<MediaStatus>>;
}

/// The four feed clients. Media is optional; a dashboard without
/// playback credentials just never shows that panel.
pub struct Feeds {
    pub transit: Box<dyn TransitFeed>,
    pub calendar: Box<dyn CalendarFeed>,
    pub weather: Box<dyn WeatherFeed>,
    pub media: Option<Box<dyn MediaFeed>>,
}

/// What one tick did, so the caller knows how long to sleep.
#[derive(Debug, PartialEq)]
pub enum TickOutcome {
    /// Inside the night window: nothing fetched, nothing rendered.
    Night,
    /// A normal cycle ran; `rendered` is false if the driver failed.
    Cycle { rendered: bool },
}

pub struct Scheduler {
    feeds: Feeds,
    driver: Box<dyn RenderTrigger>,
    stop_area_gid: String,
    platforms: Vec<String>,
    time_window: u32,
    night_start: u32,
    night_end: u32,
    /// Whether the driver has been told about the current night.
    asleep: bool,
    departures: SourceCache<DepartureBatch>,
    events: SourceCache<Vec<CalendarEvent>>,
    weather: SourceCache<WeatherSnapshot>,
    media: SourceCache<Option<MediaStatus>>,
}

impl Scheduler {
    pub fn new(cfg: &Config, feeds: Feeds, driver: Box<dyn RenderTrigger>) -> Self {
        Self {
            feeds, driver,
            stop_area_gid: cfg.stop_area_gid.clone(),
            platforms: cfg.platforms.clone(),
            time_window: cfg.time_window_minutes.unwrap_or(TIME_WINDOW),
            night_start: cfg.night_start.unwrap_or(NIGHT_START),
            night_end: cfg.night_end.unwrap_or(NIGHT_END),
            asleep: false,
            // Departures and now-playing go stale by the minute; they
            // get a zero interval and are refetched every tick.
            departures: SourceCache::new(0),
            events: SourceCache::new(cfg.calendar_interval_secs.unwrap_or(CALENDAR_INTERVAL)),
            weather: SourceCache::new(cfg.weather_interval_secs.unwrap_or(WEATHER_INTERVAL)),
            media: SourceCache::new(0),
        }
    }

    fn is_night(&self, now: &DateTime<Local>) -> bool {
        in_hour_window(now.hour(), self.night_start, self.night_end)
    }

    /// One iteration of the main loop: fetch whatever is due, assemble a
    /// view model from the caches, render. A failing source loses its
    /// turn, never the whole cycle.
    pub fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        if self.is_night(&now) {
            if !self.asleep {
                info!("[{}] night mode, suspending refreshes", now.format("%H:%M"));
                self.driver.night();
                self.asleep = true;
            }
            return TickOutcome::Night;
        }
        self.asleep = false;

        match self.feeds.transit.fetch_departures(&self.stop_area_gid, self.time_window) {
            Ok(batch) => {
                debug!("departures: {} records", batch.departures.len());
                self.departures.store(&now, batch);
            },
            Err(e) => warn!("departure fetch failed: {}", e),
        }
        if self.events.due(&now) {
            match self.feeds.calendar.fetch_events() {
                Ok(events) => {
                    info!("calendar: {} events", events.len());
                    self.events.store(&now, events);
                },
                Err(e) => warn!("calendar fetch failed: {}", e),
            }
        }
        if self.weather.due(&now) {
            match self.feeds.weather.fetch_snapshot() {
                Ok(snapshot) => self.weather.store(&now, snapshot),
                Err(e) => warn!("weather fetch failed: {}", e),
            }
        }
        if let Some(ref mut media) = self.feeds.media {
            // "Nothing playing" is a real answer and must replace the
            // cached track; only a failed fetch keeps the old one.
            match media.fetch_status() {
                Ok(status) => self.media.store(&now, status),
                Err(e) => warn!("now-playing fetch failed: {}", e),
            }
        }

        let vm = self.assemble(&now);
        let rendered = match self.driver.render(&vm) {
            Ok(()) => true,
            Err(e) => {
                warn!("render failed, previous image stays up: {}", e);
                false
            }
        };
        TickOutcome::Cycle { rendered }
    }

    /// Builds the view model from whatever the caches hold right now.
    /// Sources that have never delivered get placeholders.
    fn assemble(&self, now: &DateTime<Local>) -> ViewModel {
        let today = now.naive_local().date();
        let weekday = now.weekday().num_days_from_monday() as usize;
        let batch = self.departures.value();
        let board = batch
            .map(|b| board::aggregate(&b.departures, &self.platforms, now))
            .unwrap_or_default();
        let stop_name = batch
            .and_then(|b| b.stop_name.clone())
            .unwrap_or_default();
        let events: &[CalendarEvent] = self.events.value()
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        let weather = self.weather.value().copied()
            .unwrap_or(WeatherSnapshot { temperature: None, symbol: None });
        ViewModel {
            stop_name,
            day_name: types::DAY_NAMES[weekday].to_string(),
            date_label: format!("{} {}", now.day(), types::MONTH_NAMES[now.month0() as usize]),
            clock: now.format("%H:%M").to_string(),
            temperature: weather.temperature
                .map(|t| t.to_string())
                .unwrap_or_else(|| "--".into()),
            weather_icon: types::icon_name(weather.symbol, now.hour()),
            week: week::project(events, today),
            board,
            media: self.media.value().cloned().unwrap_or(None),
        }
    }

    /// Orderly shutdown: give the driver a chance to park the panel.
    pub fn shutdown(&mut self) {
        self.driver.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;
    use tvl_feeds::FetchError;
    use crate::config::test_config;
    use crate::errors::RenderResult;

    struct StubTransit {
        calls: Rc<Cell<u32>>,
        batch: DepartureBatch,
    }
    impl TransitFeed for StubTransit {
        fn fetch_departures(&mut self, _: &str, _: u32) -> FeedResult<DepartureBatch> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.batch.clone())
        }
    }

    struct StubCalendar {
        calls: Rc<Cell<u32>>,
    }
    impl CalendarFeed for StubCalendar {
        fn fetch_events(&mut self) -> FeedResult<Vec<CalendarEvent>> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![])
        }
    }

    struct StubWeather {
        calls: Rc<Cell<u32>>,
        script: VecDeque<FeedResult<WeatherSnapshot>>,
    }
    impl WeatherFeed for StubWeather {
        fn fetch_snapshot(&mut self) -> FeedResult<WeatherSnapshot> {
            self.calls.set(self.calls.get() + 1);
            self.script.pop_front()
                .unwrap_or(Err(FetchError::MissingField("script exhausted")))
        }
    }

    struct StubMedia {
        script: VecDeque<FeedResult<Option<MediaStatus>>>,
    }
    impl MediaFeed for StubMedia {
        fn fetch_status(&mut self) -> FeedResult<Option<MediaStatus>> {
            self.script.pop_front()
                .unwrap_or(Err(FetchError::MissingField("script exhausted")))
        }
    }

    struct CaptureRender {
        calls: Rc<Cell<u32>>,
        last: Rc<RefCell<Option<ViewModel>>>,
    }
    impl RenderTrigger for CaptureRender {
        fn render(&mut self, vm: &ViewModel) -> RenderResult<()> {
            self.calls.set(self.calls.get() + 1);
            *self.last.borrow_mut() = Some(vm.clone());
            Ok(())
        }
    }

    struct Counters {
        transit: Rc<Cell<u32>>,
        calendar: Rc<Cell<u32>>,
        weather: Rc<Cell<u32>>,
        renders: Rc<Cell<u32>>,
        last_vm: Rc<RefCell<Option<ViewModel>>>,
    }

    fn scheduler_with(weather_script: Vec<FeedResult<WeatherSnapshot>>,
                      media_script: Vec<FeedResult<Option<MediaStatus>>>) -> (Scheduler, Counters) {
        let counters = Counters {
            transit: Rc::new(Cell::new(0)),
            calendar: Rc::new(Cell::new(0)),
            weather: Rc::new(Cell::new(0)),
            renders: Rc::new(Cell::new(0)),
            last_vm: Rc::new(RefCell::new(None)),
        };
        let media: Option<Box<dyn MediaFeed>> = if media_script.is_empty() {
            None
        }
        else {
            Some(Box::new(StubMedia { script: media_script.into_iter().collect() }))
        };
        let feeds = Feeds {
            transit: Box::new(StubTransit {
                calls: counters.transit.clone(),
                batch: DepartureBatch { stop_name: Some("Brunnsparken".into()), departures: vec![] },
            }),
            calendar: Box::new(StubCalendar { calls: counters.calendar.clone() }),
            weather: Box::new(StubWeather {
                calls: counters.weather.clone(),
                script: weather_script.into_iter().collect(),
            }),
            media,
        };
        let driver = Box::new(CaptureRender {
            calls: counters.renders.clone(),
            last: counters.last_vm.clone(),
        });
        (Scheduler::new(&test_config(), feeds, driver), counters)
    }

    fn noon() -> DateTime<Local> {
        Local.ymd(2025, 6, 2).and_hms(12, 0, 0)
    }

    fn snap(temp: i32) -> WeatherSnapshot {
        WeatherSnapshot { temperature: Some(temp), symbol: Some(3) }
    }

    #[test]
    fn weather_failure_keeps_last_snapshot() {
        let (mut sched, c) = scheduler_with(
            vec![Ok(snap(7)), Err(FetchError::MissingField("t"))], vec![]);
        // weather interval is 300s by default; 10 minutes apart means
        // both ticks fetch, and the second fetch fails
        assert_eq!(sched.tick(noon()), TickOutcome::Cycle { rendered: true });
        assert_eq!(sched.tick(noon() + Duration::minutes(10)),
                   TickOutcome::Cycle { rendered: true });
        assert_eq!(c.weather.get(), 2);
        let vm = c.last_vm.borrow();
        let vm = vm.as_ref().unwrap();
        assert_eq!(vm.temperature, "7");
        // the rest of the dashboard still rendered
        assert_eq!(vm.stop_name, "Brunnsparken");
        assert_eq!(vm.week.len(), 7);
    }

    #[test]
    fn placeholders_before_first_success() {
        let (mut sched, c) = scheduler_with(
            vec![Err(FetchError::MissingField("t"))], vec![]);
        sched.tick(noon());
        let vm = c.last_vm.borrow();
        let vm = vm.as_ref().unwrap();
        assert_eq!(vm.temperature, "--");
        assert_eq!(vm.weather_icon, "cloud");
        assert!(vm.board.is_empty());
        assert!(vm.media.is_none());
    }

    #[test]
    fn night_mode_fetches_and_renders_nothing() {
        let (mut sched, c) = scheduler_with(vec![Ok(snap(7))], vec![]);
        let night = Local.ymd(2025, 6, 2).and_hms(4, 0, 0);
        assert_eq!(sched.tick(night), TickOutcome::Night);
        assert_eq!(c.transit.get(), 0);
        assert_eq!(c.calendar.get(), 0);
        assert_eq!(c.weather.get(), 0);
        assert_eq!(c.renders.get(), 0);
        // and the window is half-open: 05:00 is morning again
        let morning = Local.ymd(2025, 6, 2).and_hms(5, 0, 0);
        assert_eq!(sched.tick(morning), TickOutcome::Cycle { rendered: true });
        assert_eq!(c.transit.get(), 1);
    }

    #[test]
    fn calendar_waits_for_its_interval() {
        let (mut sched, c) = scheduler_with(vec![Ok(snap(7)), Ok(snap(8))], vec![]);
        sched.tick(noon());
        // 10 minutes later: departures again, calendar (3600s) not yet
        sched.tick(noon() + Duration::minutes(10));
        assert_eq!(c.transit.get(), 2);
        assert_eq!(c.calendar.get(), 1);
        // an hour and a bit later the calendar goes again
        sched.tick(noon() + Duration::minutes(70));
        assert_eq!(c.calendar.get(), 2);
    }

    #[test]
    fn media_silence_replaces_cached_track() {
        let status = MediaStatus {
            artist: "King Gizzard".into(),
            track: "Gamma Knife".into(),
            album: "Nonagon Infinity".into(),
            image_url: None,
            is_playing: true,
        };
        let (mut sched, c) = scheduler_with(
            vec![Ok(snap(7)), Ok(snap(7))],
            vec![Ok(Some(status)), Ok(None)]);
        sched.tick(noon());
        {
            let vm = c.last_vm.borrow();
            assert_eq!(vm.as_ref().unwrap().media.as_ref().unwrap().track, "Gamma Knife");
        }
        sched.tick(noon() + Duration::minutes(1));
        let vm = c.last_vm.borrow();
        assert!(vm.as_ref().unwrap().media.is_none());
    }

    #[test]
    fn cache_due_logic() {
        let mut cache: SourceCache<u32> = SourceCache::new(300);
        let t0 = noon();
        assert!(cache.due(&t0));
        cache.store(&t0, 1);
        assert!(!cache.due(&t0));
        assert!(!cache.due(&(t0 + Duration::seconds(300))));
        assert!(cache.due(&(t0 + Duration::seconds(301))));
        assert_eq!(cache.value(), Some(&1));
    }
}
