//! Clock arithmetic for the refresh loop.

use chrono::prelude::*;
use chrono::Duration;

/// How many seconds to sleep so the next tick lands on a minute boundary.
///
/// If the boundary is less than a second away, skips to the one after, so
/// a slow render can't make us refresh twice in the same minute.
pub fn secs_until_next_minute(now: &DateTime<Local>) -> u32 {
    let secs = 60 - now.second();
    if secs < 1 {
        secs + 60
    }
    else {
        secs
    }
}

/// The Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Whether `hour` falls inside the half-open window `[start, end)`.
///
/// A window with `start > end` crosses midnight.
pub fn in_hour_window(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        start <= hour && hour < end
    }
    else {
        hour >= start || hour < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_alignment() {
        let t = Local.ymd(2025, 6, 2).and_hms(12, 0, 30);
        assert_eq!(secs_until_next_minute(&t), 30);
        let t = Local.ymd(2025, 6, 2).and_hms(12, 0, 59);
        assert_eq!(secs_until_next_minute(&t), 1);
        let t = Local.ymd(2025, 6, 2).and_hms(12, 0, 0);
        assert_eq!(secs_until_next_minute(&t), 60);
    }

    #[test]
    fn monday_anchor() {
        let mon = NaiveDate::from_ymd(2025, 6, 2);
        assert_eq!(week_start(mon), mon);
        assert_eq!(week_start(NaiveDate::from_ymd(2025, 6, 5)), mon);
        assert_eq!(week_start(NaiveDate::from_ymd(2025, 6, 8)), mon);
        // across a year boundary
        assert_eq!(week_start(NaiveDate::from_ymd(2026, 1, 1)),
                   NaiveDate::from_ymd(2025, 12, 29));
    }

    #[test]
    fn hour_windows() {
        assert!(in_hour_window(3, 3, 5));
        assert!(in_hour_window(4, 3, 5));
        assert!(!in_hour_window(5, 3, 5));
        assert!(!in_hour_window(2, 3, 5));
        // a window crossing midnight
        assert!(in_hour_window(23, 22, 6));
        assert!(in_hour_window(2, 22, 6));
        assert!(!in_hour_window(12, 22, 6));
        // degenerate empty window
        assert!(!in_hour_window(3, 3, 3));
    }
}
