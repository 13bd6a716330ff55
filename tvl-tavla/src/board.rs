//! Builds the departure board: grouping, ordering, and display
//! formatting.

use std::collections::HashMap;
use chrono::prelude::*;
use tvl_feeds::transit::Departure;

use crate::types::BoardRow;

/// Rows shown on the board.
static MAX_ROWS: usize = 5;
/// Ordering sentinel: rows with nothing to go on, and line labels that
/// aren't numbers, sort last.
static SORT_SENTINEL: i64 = 9999;

/// How far away a departure is, in whole minutes.
///
/// Uses the realtime estimate when there is one, rounds to the nearest
/// minute, and never goes negative: a tram that should already have left
/// is "Nu", not "-1".
fn minutes_until(dep: &Departure, now: &DateTime<Local>) -> i64 {
    let when = dep.estimated.unwrap_or(dep.planned);
    let secs = when.signed_duration_since(*now).num_seconds();
    let mins = (secs as f64 / 60.0).round() as i64;
    if mins < 0 { 0 } else { mins }
}

/// A departure reduced to what the display cells need.
#[derive(Debug, Clone)]
struct TimedDeparture {
    minutes: i64,
    abs_time: String,
    cancelled: bool,
}

/// Formats one display cell: cancellation beats everything, "Nu" for
/// right now, bare minutes up to an hour, absolute time beyond that.
fn format_time(dep: Option<&TimedDeparture>) -> String {
    let dep = match dep {
        Some(d) => d,
        None => return String::new(),
    };
    if dep.cancelled {
        return "Inst".into();
    }
    match dep.minutes {
        0 => "Nu".into(),
        m if m < 60 => m.to_string(),
        _ => dep.abs_time.clone(),
    }
}

/// Numeric value of a line label, for ordering.
fn line_number(line: &str) -> i64 {
    line.trim().parse().unwrap_or(SORT_SENTINEL)
}

/// Groups raw departures into board rows: one row per (line,
/// destination, via), at most [`MAX_ROWS`] rows, soonest first.
///
/// `platforms` limits the board to those platform labels; an empty slice
/// keeps everything.
pub fn aggregate(records: &[Departure], platforms: &[String], now: &DateTime<Local>) -> Vec<BoardRow> {
    type GroupKey = (String, String, Option<String>);
    let mut groups: HashMap<GroupKey, (String, Vec<TimedDeparture>)> = HashMap::new();
    for dep in records {
        if !platforms.is_empty() && !platforms.contains(&dep.platform) {
            continue;
        }
        let timed = TimedDeparture {
            minutes: minutes_until(dep, now),
            abs_time: dep.estimated.unwrap_or(dep.planned).format("%H:%M").to_string(),
            cancelled: dep.cancelled,
        };
        let key = (dep.line.clone(), dep.destination.clone(), dep.via.clone());
        groups.entry(key)
            .or_insert_with(|| (dep.platform.clone(), vec![]))
            .1.push(timed);
    }
    let mut rows = vec![];
    for ((line, destination, _via), (platform, mut deps)) in groups {
        deps.sort_by_key(|d| d.minutes);
        let sort_minutes = deps.get(0).map(|d| d.minutes).unwrap_or(SORT_SENTINEL);
        let next = format_time(deps.get(0));
        let later = format_time(deps.get(1));
        rows.push(BoardRow { line, destination, platform, next, later, sort_minutes });
    }
    rows.sort_by_key(|r| (r.sort_minutes, line_number(&r.line)));
    rows.truncate(MAX_ROWS);
    rows
}
