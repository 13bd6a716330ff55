//! Standard configuration module.
//!
//! Refresh intervals, the night window, and endpoint addresses are all
//! options here; the scheduler and render modules carry the defaults.

use serde_derive::Deserialize;
use tvl_util::{ConfigExt, crate_name};

/// `tvl-tavla` configuration.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Stop area to show departures for (its GID in the planner API).
    pub stop_area_gid: String,
    /// Planner API credentials.
    pub transit_key: String,
    pub transit_secret: String,
    /// Calendar feed URLs.
    #[serde(default)]
    pub ics_urls: Vec<String>,
    /// Coordinates for the weather forecast, as decimal-degree strings.
    pub latitude: String,
    pub longitude: String,
    /// Only show departures from these platforms. Empty means all of
    /// them.
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Now-playing API credentials. Leave unset to drop that panel.
    #[serde(default)]
    pub media_client_id: Option<String>,
    #[serde(default)]
    pub media_client_secret: Option<String>,
    #[serde(default)]
    pub media_refresh_token: Option<String>,
    /// Endpoint overrides, mostly useful for testing against fakes.
    #[serde(default)]
    pub transit_api_url: Option<String>,
    #[serde(default)]
    pub transit_token_url: Option<String>,
    #[serde(default)]
    pub weather_api_url: Option<String>,
    #[serde(default)]
    pub media_api_url: Option<String>,
    #[serde(default)]
    pub media_token_url: Option<String>,
    /// Refresh intervals, in seconds.
    #[serde(default)]
    pub weather_interval_secs: Option<u64>,
    #[serde(default)]
    pub calendar_interval_secs: Option<u64>,
    /// Night mode window (local hours, half-open) and sleep quantum.
    #[serde(default)]
    pub night_start: Option<u32>,
    #[serde(default)]
    pub night_end: Option<u32>,
    #[serde(default)]
    pub night_sleep_secs: Option<u64>,
    /// How far ahead to ask for departures, in minutes.
    #[serde(default)]
    pub time_window_minutes: Option<u32>,
    /// Render driver: "sim" (the default) or "command".
    #[serde(default)]
    pub driver: Option<String>,
    /// Where the rendered view model JSON lands.
    #[serde(default)]
    pub output_path: Option<String>,
    /// External command run by the "command" driver.
    #[serde(default)]
    pub render_command: Option<String>,
}

impl ConfigExt for Config {
    fn crate_name() -> &'static str {
        crate_name!()
    }
}

/// A fully-populated config for tests, with every optional knob unset.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        stop_area_gid: "9021014001960000".into(),
        transit_key: "key".into(),
        transit_secret: "secret".into(),
        ics_urls: vec![],
        latitude: "57.70".into(),
        longitude: "11.97".into(),
        platforms: vec![],
        media_client_id: None,
        media_client_secret: None,
        media_refresh_token: None,
        transit_api_url: None,
        transit_token_url: None,
        weather_api_url: None,
        media_api_url: None,
        media_token_url: None,
        weather_interval_secs: None,
        calendar_interval_secs: None,
        night_start: None,
        night_end: None,
        night_sleep_secs: None,
        time_window_minutes: None,
        driver: None,
        output_path: None,
        render_command: None,
    }
}
