//! The view model handed to the render driver, and the display
//! vocabulary (Swedish labels, weather icons) that goes with it.

use serde_derive::Serialize;
use tvl_feeds::media::MediaStatus;

/// Weekday initials for the week grid, Monday first.
pub static DAY_LETTERS: [&str; 7] = ["M", "T", "O", "T", "F", "L", "S"];
/// Full weekday names, Monday first.
pub static DAY_NAMES: [&str; 7] = [
    "Måndag", "Tisdag", "Onsdag", "Torsdag", "Fredag", "Lördag", "Söndag"
];
/// Month abbreviations, January first.
pub static MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Maj", "Jun",
    "Jul", "Aug", "Sep", "Okt", "Nov", "Dec"
];

/// One line of the departure board: all departures of one line towards
/// one destination (via one routing), collapsed to "next" and "later".
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BoardRow {
    pub line: String,
    pub destination: String,
    pub platform: String,
    /// Display string for the next departure.
    pub next: String,
    /// Display string for the one after, or empty.
    pub later: String,
    /// Minutes until the next departure; only used for ordering.
    pub sort_minutes: i64,
}

/// One column of the week calendar.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WeekDay {
    pub label: String,
    pub is_today: bool,
    pub events: Vec<EventBlock>,
}

/// An event positioned for layout: start and end as fractional hours
/// (half past nine is 9.5).
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EventBlock {
    pub name: String,
    pub start: f64,
    pub end: f64,
}

/// Everything the renderer needs for one refresh.
#[derive(Serialize, Debug, Clone)]
pub struct ViewModel {
    pub stop_name: String,
    pub day_name: String,
    pub date_label: String,
    pub clock: String,
    /// Whole degrees, or "--" if no forecast has ever arrived.
    pub temperature: String,
    pub weather_icon: &'static str,
    pub week: Vec<WeekDay>,
    pub board: Vec<BoardRow>,
    pub media: Option<MediaStatus>,
}

/// Maps a forecast symbol code to an icon name, with night variants for
/// the clear and partly-cloudy symbols.
pub fn icon_name(symbol: Option<i32>, hour: u32) -> &'static str {
    let code = match symbol {
        Some(c) => c,
        None => return "cloud",
    };
    let night = hour >= 21 || hour < 6;
    match code {
        1 => if night { "moon" } else { "sun" },
        2 | 3 => if night { "cloud-moon" } else { "cloud-sun" },
        4 | 5 | 6 => "cloud",
        7 => "cloud-fog",
        8 | 18 => "cloud-drizzle",
        9 | 10 | 19 | 20 => "cloud-rain",
        11 | 21 => "cloud-lightning",
        12..=14 | 22..=24 => "cloud-hail",
        15..=17 | 25..=27 => "snowflake",
        _ => "cloud",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icons_follow_the_sun() {
        assert_eq!(icon_name(Some(1), 12), "sun");
        assert_eq!(icon_name(Some(1), 23), "moon");
        assert_eq!(icon_name(Some(2), 12), "cloud-sun");
        assert_eq!(icon_name(Some(3), 4), "cloud-moon");
    }

    #[test]
    fn unknown_codes_fall_back_to_cloud() {
        assert_eq!(icon_name(None, 12), "cloud");
        assert_eq!(icon_name(Some(99), 12), "cloud");
        assert_eq!(icon_name(Some(0), 12), "cloud");
    }

    #[test]
    fn precipitation_codes() {
        assert_eq!(icon_name(Some(19), 12), "cloud-rain");
        assert_eq!(icon_name(Some(21), 12), "cloud-lightning");
        assert_eq!(icon_name(Some(26), 12), "snowflake");
    }
}
