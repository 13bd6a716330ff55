//! The e-ink dashboard daemon: departures, week calendar, weather, and
//! now-playing on one panel, refreshed once a minute.

pub mod errors;
pub mod config;
pub mod types;
pub mod board;
pub mod week;
pub mod scheduler;
pub mod render;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use chrono::prelude::*;
use log::*;
use tvl_util::{ConfigExt, user_agent};
use tvl_util::time::secs_until_next_minute;
use tvl_feeds::FeedResult;
use tvl_feeds::transit::{TransitClient, DepartureBatch};
use tvl_feeds::calendar::{CalendarClient, CalendarEvent};
use tvl_feeds::weather::{WeatherClient, WeatherSnapshot};
use tvl_feeds::media::{MediaClient, MediaStatus};

use crate::config::Config;
use crate::scheduler::{Scheduler, Feeds, TickOutcome};
use crate::errors::Result;

impl scheduler::TransitFeed for TransitClient {
    fn fetch_departures(&mut self, stop_area_gid: &str, window_minutes: u32) -> FeedResult<DepartureBatch> {
        TransitClient::fetch_departures(self, stop_area_gid, window_minutes)
    }
}

impl scheduler::CalendarFeed for CalendarClient {
    fn fetch_events(&mut self) -> FeedResult<Vec<CalendarEvent>> {
        CalendarClient::fetch_events(self)
    }
}

/// The weather client plus the coordinates it gets asked about.
struct WeatherSource {
    cli: WeatherClient,
    latitude: String,
    longitude: String,
}

impl scheduler::WeatherFeed for WeatherSource {
    fn fetch_snapshot(&mut self) -> FeedResult<WeatherSnapshot> {
        self.cli.fetch_snapshot(&self.latitude, &self.longitude)
    }
}

impl scheduler::MediaFeed for MediaClient {
    fn fetch_status(&mut self) -> FeedResult<Option<MediaStatus>> {
        MediaClient::fetch_status(self)
    }
}

fn media_feed(cfg: &Config) -> Option<Box<dyn scheduler::MediaFeed>> {
    match (&cfg.media_client_id, &cfg.media_client_secret, &cfg.media_refresh_token) {
        (Some(id), Some(secret), Some(refresh)) => {
            Some(Box::new(MediaClient::new(
                user_agent!(), id.clone(), secret.clone(), refresh.clone(),
                cfg.media_api_url.clone(), cfg.media_token_url.clone())))
        },
        _ => {
            info!("now-playing credentials not configured; skipping that panel");
            None
        }
    }
}

fn build_feeds(cfg: &Config) -> Feeds {
    if cfg.ics_urls.is_empty() {
        warn!("no calendar feeds configured; the week view will stay empty");
    }
    Feeds {
        transit: Box::new(TransitClient::new(
            user_agent!(),
            cfg.transit_key.clone(), cfg.transit_secret.clone(),
            cfg.transit_api_url.clone(), cfg.transit_token_url.clone())),
        calendar: Box::new(CalendarClient::new(user_agent!(), cfg.ics_urls.clone())),
        weather: Box::new(WeatherSource {
            cli: WeatherClient::new(user_agent!(), cfg.weather_api_url.clone()),
            latitude: cfg.latitude.clone(),
            longitude: cfg.longitude.clone(),
        }),
        media: media_feed(cfg),
    }
}

/// Sleeps in one-second slices so an interrupt never has to wait out a
/// five-minute night nap.
fn sleep_interruptible(secs: u64, running: &AtomicBool) {
    for _ in 0..secs {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        thread::sleep(Duration::from_secs(1));
    }
}

fn main() -> Result<()> {
    tvl_util::setup_logging()?;
    info!("tvl-tavla, but not yet");
    info!("loading config");
    let cfg = Config::load()?;
    let driver = render::driver_from_config(&cfg)?;
    let feeds = build_feeds(&cfg);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let night_sleep = cfg.night_sleep_secs.unwrap_or(scheduler::NIGHT_SLEEP_SECS);
    let mut sched = Scheduler::new(&cfg, feeds, driver);
    info!("entering refresh loop");
    while running.load(Ordering::SeqCst) {
        let started = Local::now();
        let secs = match sched.tick(started) {
            TickOutcome::Night => night_sleep,
            TickOutcome::Cycle { rendered } => {
                let now = Local::now();
                debug!("cycle took {}s (rendered: {})",
                       now.signed_duration_since(started).num_seconds(), rendered);
                u64::from(secs_until_next_minute(&now))
            }
        };
        sleep_interruptible(secs, &running);
    }
    info!("interrupt received, shutting down");
    sched.shutdown();
    Ok(())
}
