//! Client for the stop-area departures API.
//!
//! Auth is OAuth2 client credentials: we trade a key and secret for a
//! bearer token, and keep using it until the API stops accepting it.

use chrono::prelude::*;
use serde_derive::Deserialize;
use serde_json::Value;
use log::*;
use tvl_util::http::{ApiClient, HttpError};

use crate::errors::*;

/// Default base URL of the planner API.
static DEFAULT_API_URL: &str = "https://ext-api.vasttrafik.se/pr/v4";
/// Default token endpoint.
static DEFAULT_TOKEN_URL: &str = "https://ext-api.vasttrafik.se/token";
/// How many departures per line and direction to ask for. Two get shown
/// per board row; the spares cover cancellations.
static PER_DIRECTION: u32 = 4;

/// One departure, normalized from the wire format.
#[derive(Debug, Clone)]
pub struct Departure {
    /// Line label as displayed ("5", "X4", "Grön Express").
    pub line: String,
    /// Destination, short form.
    pub destination: String,
    /// Via annotation, where the line runs multiple routings.
    pub via: Option<String>,
    /// Platform letter at the stop area.
    pub platform: String,
    /// Timetabled departure time.
    pub planned: DateTime<Local>,
    /// Realtime estimate, where the API has one.
    pub estimated: Option<DateTime<Local>>,
    /// Whether this departure has been cancelled.
    pub cancelled: bool,
}

/// A whole fetch's worth of departures, plus the stop's display name.
#[derive(Debug, Clone)]
pub struct DepartureBatch {
    pub stop_name: Option<String>,
    pub departures: Vec<Departure>,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize, Debug)]
struct DeparturesResponse {
    /// Left as raw values so one malformed entry can be skipped instead
    /// of failing the whole response.
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiDeparture {
    stop_point: ApiStopPoint,
    planned_time: DateTime<FixedOffset>,
    #[serde(default)]
    estimated_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    is_cancelled: bool,
    service_journey: ApiServiceJourney,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiStopPoint {
    name: String,
    #[serde(default)]
    platform: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiServiceJourney {
    line: ApiLine,
    direction_details: ApiDirectionDetails,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiLine {
    short_name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ApiDirectionDetails {
    short_direction: String,
    #[serde(default)]
    via: Option<String>,
}

pub struct TransitClient {
    api: ApiClient,
    token_url: String,
    key: String,
    secret: String,
    token: Option<String>,
}

impl TransitClient {
    pub fn new(ua: String, key: String, secret: String, api_url: Option<String>, token_url: Option<String>) -> Self {
        let api = ApiClient::new(ua, "transit",
                                 api_url.unwrap_or_else(|| DEFAULT_API_URL.into()));
        Self {
            api,
            token_url: token_url.unwrap_or_else(|| DEFAULT_TOKEN_URL.into()),
            key, secret,
            token: None,
        }
    }
    fn access_token(&mut self) -> FeedResult<String> {
        match self.token {
            Some(ref tok) => Ok(tok.clone()),
            None => {
                debug!("fetching a new planner access token");
                let resp: TokenResponse = self.api.post_form(
                    &self.token_url,
                    &[("grant_type", "client_credentials")],
                    &self.key, &self.secret)?;
                self.token = Some(resp.access_token.clone());
                Ok(resp.access_token)
            }
        }
    }
    /// Fetches upcoming departures for a stop area, looking
    /// `window_minutes` ahead.
    ///
    /// An empty board is a normal answer (last tram gone for the night);
    /// only transport/auth problems are errors.
    pub fn fetch_departures(&mut self, stop_area_gid: &str, window_minutes: u32) -> FeedResult<DepartureBatch> {
        let token = self.access_token()?;
        let path = format!(
            "/stop-areas/{}/departures?timeSpanInMinutes={}&maxDeparturesPerLineAndDirection={}&limit=80&offset=0&includeOccupancy=false",
            stop_area_gid, window_minutes, PER_DIRECTION);
        let resp: DeparturesResponse = match self.api.get_json(&path, Some(&token)) {
            Ok(r) => r,
            Err(e) => {
                if let HttpError::Status { code: 401, .. } = e {
                    debug!("planner token rejected; will grab a fresh one next fetch");
                    self.token = None;
                }
                return Err(e.into());
            }
        };
        Ok(normalize(resp.results))
    }
}

/// Turns raw result entries into `Departure`s, skipping (with a warning)
/// any entry that doesn't carry the fields we need.
fn normalize(results: Vec<Value>) -> DepartureBatch {
    let mut stop_name = None;
    let mut departures = vec![];
    for (i, raw) in results.into_iter().enumerate() {
        let item: ApiDeparture = match serde_json::from_value(raw) {
            Ok(item) => item,
            Err(e) => {
                warn!("skipping malformed departure #{}: {}", i, e);
                continue;
            }
        };
        if stop_name.is_none() {
            stop_name = Some(display_name(&item.stop_point.name));
        }
        let sj = item.service_journey;
        departures.push(Departure {
            line: sj.line.short_name,
            destination: sj.direction_details.short_direction,
            via: sj.direction_details.via,
            platform: item.stop_point.platform.unwrap_or_else(|| "?".into()),
            planned: item.planned_time.with_timezone(&Local),
            estimated: item.estimated_time.map(|t| t.with_timezone(&Local)),
            cancelled: item.is_cancelled,
        });
    }
    DepartureBatch { stop_name, departures }
}

/// Stop names come back as "Brunnsparken, Göteborg"; the city part is
/// noise on a board that's physically bolted to a wall in that city.
fn display_name(raw: &str) -> String {
    match raw.find(',') {
        Some(i) => raw[..i].trim().to_string(),
        None => raw.trim().to_string(),
    }
}
