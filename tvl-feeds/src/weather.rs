//! Weather feed client, reading a point forecast from the met office's
//! open data API.
//!
//! The forecast carries a pile of parameters per timestamp; the dashboard
//! cares about exactly two of them.

use serde_derive::Deserialize;
use log::*;
use tvl_util::http::ApiClient;

use crate::errors::*;

/// Default base URL of the point forecast API.
static DEFAULT_API_URL: &str = "https://opendata-download-metfcst.smhi.se/api/category/pmp3g/version/2";

/// The two values the dashboard actually displays.
#[derive(Debug, Clone, Copy)]
pub struct WeatherSnapshot {
    /// Air temperature, rounded to whole degrees.
    pub temperature: Option<i32>,
    /// Forecast symbol code (`Wsymb2`, 1-27).
    pub symbol: Option<i32>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PointForecast {
    #[serde(default)]
    time_series: Vec<ForecastEntry>,
}

#[derive(Deserialize, Debug)]
struct ForecastEntry {
    #[serde(default)]
    parameters: Vec<ForecastParameter>,
}

#[derive(Deserialize, Debug)]
struct ForecastParameter {
    name: String,
    #[serde(default)]
    values: Vec<f64>,
}

pub struct WeatherClient {
    api: ApiClient,
}

impl WeatherClient {
    pub fn new(ua: String, api_url: Option<String>) -> Self {
        Self {
            api: ApiClient::new(ua, "weather",
                                api_url.unwrap_or_else(|| DEFAULT_API_URL.into()))
        }
    }
    /// Fetches the forecast for a coordinate and keeps the first (i.e.
    /// current) entry. Coordinates are decimal-degree strings, passed
    /// through to the URL untouched.
    pub fn fetch_snapshot(&self, lat: &str, lon: &str) -> FeedResult<WeatherSnapshot> {
        let path = format!("/geotype/point/lon/{}/lat/{}/data.json", lon, lat);
        let forecast: PointForecast = self.api.get_json(&path, None)?;
        let entry = forecast.time_series.into_iter().next()
            .ok_or(FetchError::MissingField("timeSeries"))?;
        Ok(snapshot_from(entry))
    }
}

fn snapshot_from(entry: ForecastEntry) -> WeatherSnapshot {
    let mut temperature = None;
    let mut symbol = None;
    for p in entry.parameters {
        match (p.name.as_str(), p.values.get(0)) {
            ("t", Some(v)) => temperature = Some(v.round() as i32),
            ("Wsymb2", Some(v)) => symbol = Some(*v as i32),
            _ => {}
        }
    }
    if temperature.is_none() {
        warn!("forecast entry carried no temperature");
    }
    WeatherSnapshot { temperature, symbol }
}
