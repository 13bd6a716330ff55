//! Projects calendar events onto the fixed Monday–Sunday week grid.

use chrono::prelude::*;
use chrono::Duration;
use tvl_feeds::calendar::CalendarEvent;
use tvl_util::time::week_start;

use crate::types::{WeekDay, EventBlock, DAY_LETTERS};

fn hour_fraction(dt: &DateTime<Local>) -> f64 {
    f64::from(dt.hour()) + f64::from(dt.minute()) / 60.0
}

/// Builds the 7-column week view for the week containing `today`.
///
/// Each event lands in the column matching its local start date; events
/// outside the current week simply don't appear. Always returns exactly
/// seven days, Monday first, with `is_today` set on precisely one of
/// them.
pub fn project(events: &[CalendarEvent], today: NaiveDate) -> Vec<WeekDay> {
    let monday = week_start(today);
    let mut week = Vec::with_capacity(7);
    for i in 0..7 {
        let date = monday + Duration::days(i64::from(i));
        let mut blocks: Vec<EventBlock> = events.iter()
            .filter(|e| e.start.naive_local().date() == date)
            .map(|e| EventBlock {
                name: e.name.clone(),
                start: hour_fraction(&e.start),
                end: hour_fraction(&e.end),
            })
            .collect();
        blocks.sort_by(|a, b| {
            a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal)
        });
        week.push(WeekDay {
            label: DAY_LETTERS[i as usize].to_string(),
            is_today: date == today,
            events: blocks,
        });
    }
    week
}
