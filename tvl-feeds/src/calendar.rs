//! Calendar feed client: fetches iCalendar data and boils it down to the
//! handful of fields the week view needs.
//!
//! The parser is deliberately small: unfold continuation lines, walk the
//! VEVENT blocks, read SUMMARY/DTSTART/DTEND. An event it can't make
//! sense of is dropped with a warning; the rest of the feed carries on.

use chrono::prelude::*;
use chrono::offset::LocalResult;
use chrono::Duration;
use chrono_tz::Tz;
use log::*;
use tvl_util::http::ApiClient;

use crate::errors::*;

/// One calendar event, normalized to local wall-clock time.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub name: String,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

pub struct CalendarClient {
    http: ApiClient,
    urls: Vec<String>,
}

impl CalendarClient {
    /// `urls` are complete feed URLs; a household tends to have a few.
    pub fn new(ua: String, urls: Vec<String>) -> Self {
        Self {
            http: ApiClient::new(ua, "calendar", String::new()),
            urls
        }
    }
    /// Fetches and parses every configured feed, concatenating their
    /// events. Events may span arbitrary dates; filtering to the current
    /// week is the projector's business.
    pub fn fetch_events(&self) -> FeedResult<Vec<CalendarEvent>> {
        let mut ret = vec![];
        for url in &self.urls {
            let body = self.http.get_text(url)?;
            ret.extend(parse_ics(&body));
        }
        Ok(ret)
    }
}

/// A DTSTART/DTEND value: either a zoned instant or an all-day date.
enum Stamp {
    Zoned(DateTime<Local>),
    AllDay(NaiveDate),
}

#[derive(Default)]
struct RawEvent {
    name: Option<String>,
    start: Option<Stamp>,
    end: Option<Stamp>,
    /// First thing that failed to parse; reported when the block closes.
    bad: Option<String>,
}

/// Parses one iCalendar document into normalized events.
pub fn parse_ics(raw: &str) -> Vec<CalendarEvent> {
    let mut events = vec![];
    let mut cur: Option<RawEvent> = None;
    for line in unfold(raw) {
        let (name, params, value) = match split_property(&line) {
            Some(parts) => parts,
            None => continue
        };
        match name.to_ascii_uppercase().as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VEVENT") => {
                cur = Some(RawEvent::default());
            },
            "END" if value.eq_ignore_ascii_case("VEVENT") => {
                if let Some(ev) = cur.take() {
                    let label = ev.name.clone().unwrap_or_else(|| "(namnlös)".into());
                    match finalize(ev) {
                        Ok(event) => events.push(event),
                        Err(e) => warn!("skipping event \"{}\": {}", label, e),
                    }
                }
            },
            "SUMMARY" => {
                if let Some(ev) = cur.as_mut() {
                    ev.name = Some(unescape(value));
                }
            },
            "DTSTART" => {
                if let Some(ev) = cur.as_mut() {
                    match parse_stamp(params, value) {
                        Ok(s) => ev.start = Some(s),
                        Err(e) => ev.bad = Some(format!("DTSTART: {}", e)),
                    }
                }
            },
            "DTEND" => {
                if let Some(ev) = cur.as_mut() {
                    match parse_stamp(params, value) {
                        Ok(s) => ev.end = Some(s),
                        Err(e) => ev.bad = Some(format!("DTEND: {}", e)),
                    }
                }
            },
            _ => {}
        }
    }
    events
}

fn finalize(ev: RawEvent) -> Result<CalendarEvent, String> {
    if let Some(bad) = ev.bad {
        return Err(bad);
    }
    let name = ev.name.unwrap_or_else(|| "(namnlös)".into());
    match ev.start.ok_or("event has no DTSTART")? {
        Stamp::Zoned(start) => {
            let end = match ev.end {
                Some(Stamp::Zoned(end)) => end,
                // No usable end; an hour is as good a guess as any.
                _ => start + Duration::hours(1),
            };
            Ok(CalendarEvent { name, start, end })
        },
        Stamp::AllDay(date) => {
            // All-day events get pinned to their start day so they stay
            // in one column of the week view. DTEND is exclusive for
            // these and doesn't change the column.
            let start = resolve_local(&Local, &date.and_hms(0, 0, 0))
                .ok_or("midnight doesn't exist in this timezone today")?;
            let end = resolve_local(&Local, &date.and_hms(23, 59, 0))
                .ok_or("end of day doesn't exist in this timezone today")?;
            Ok(CalendarEvent { name, start, end })
        }
    }
}

fn parse_stamp(params: &str, value: &str) -> Result<Stamp, String> {
    if has_param(params, "VALUE=DATE") || (value.len() == 8 && !value.contains('T')) {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d")
            .map_err(|e| format!("bad date {:?}: {}", value, e))?;
        return Ok(Stamp::AllDay(date));
    }
    if value.ends_with('Z') {
        let naive = NaiveDateTime::parse_from_str(&value[..value.len() - 1], "%Y%m%dT%H%M%S")
            .map_err(|e| format!("bad UTC stamp {:?}: {}", value, e))?;
        let utc = DateTime::<Utc>::from_utc(naive, Utc);
        return Ok(Stamp::Zoned(utc.with_timezone(&Local)));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map_err(|e| format!("bad stamp {:?}: {}", value, e))?;
    if let Some(tzname) = tzid(params) {
        let tz: Tz = tzname.parse()
            .map_err(|e: String| format!("unknown TZID {:?}: {}", tzname, e))?;
        let zoned = resolve_local(&tz, &naive)
            .ok_or_else(|| format!("{} doesn't exist in {}", value, tzname))?;
        return Ok(Stamp::Zoned(zoned.with_timezone(&Local)));
    }
    // No zone information at all: a floating local time.
    let local = resolve_local(&Local, &naive)
        .ok_or_else(|| format!("{} doesn't exist locally", value))?;
    Ok(Stamp::Zoned(local))
}

/// Resolves a naive wall-clock time in `tz`, taking the earlier side of a
/// DST fold.
fn resolve_local<T: TimeZone>(tz: &T, naive: &NaiveDateTime) -> Option<DateTime<T>> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(dt, _) => Some(dt),
        LocalResult::None => None,
    }
}

fn has_param(params: &str, wanted: &str) -> bool {
    params.split(';').any(|p| p.eq_ignore_ascii_case(wanted))
}

fn tzid(params: &str) -> Option<&str> {
    for p in params.split(';') {
        if p.len() > 5 && p[..5].eq_ignore_ascii_case("TZID=") {
            return Some(p[5..].trim_matches('"'));
        }
    }
    None
}

/// Undoes RFC 5545 line folding: a line starting with whitespace continues
/// the previous one.
fn unfold(raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = vec![];
    for line in raw.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = lines.last_mut() {
                last.push_str(&line[1..]);
                continue;
            }
        }
        lines.push(line.to_string());
    }
    lines
}

/// Splits `NAME;PARAM=X:value` into (name, params, value).
fn split_property(line: &str) -> Option<(&str, &str, &str)> {
    let colon = line.find(':')?;
    let (head, value) = (&line[..colon], &line[colon + 1..]);
    match head.find(';') {
        Some(i) => Some((&head[..i], &head[i + 1..], value)),
        None => Some((head, "", value)),
    }
}

/// Undoes the TEXT escapes that actually show up in feeds.
fn unescape(value: &str) -> String {
    value.replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\n", " ")
        .replace("\\\\", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    static SAMPLE: &str = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "SUMMARY:Tandläkare\r\n",
        "DTSTART;TZID=Europe/Stockholm:20250604T093000\r\n",
        "DTEND;TZID=Europe/Stockholm:20250604T101500\r\n",
        "END:VEVENT\r\n",
        "BEGIN:VEVENT\r\n",
        "SUMMARY:Standup\\, veckovis\r\n",
        " (fortsättning)\r\n",
        "DTSTART:20250605T070000Z\r\n",
        "DTEND:20250605T071500Z\r\n",
        "END:VEVENT\r\n",
        "BEGIN:VEVENT\r\n",
        "SUMMARY:Trasigt möte\r\n",
        "DTSTART;TZID=Mars/Olympus:20250606T120000\r\n",
        "DTEND;TZID=Mars/Olympus:20250606T130000\r\n",
        "END:VEVENT\r\n",
        "BEGIN:VEVENT\r\n",
        "SUMMARY:Semester\r\n",
        "DTSTART;VALUE=DATE:20250607\r\n",
        "DTEND;VALUE=DATE:20250608\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n");

    #[test]
    fn parses_zoned_events() {
        let events = parse_ics(SAMPLE);
        let ev = &events[0];
        assert_eq!(ev.name, "Tandläkare");
        // compare in the feed's own zone to stay independent of the
        // machine's local zone
        let tz: Tz = "Europe/Stockholm".parse().unwrap();
        let expected = tz.ymd(2025, 6, 4).and_hms(9, 30, 0);
        assert_eq!(ev.start.timestamp(), expected.timestamp());
        assert_eq!(ev.end.timestamp() - ev.start.timestamp(), 45 * 60);
    }

    #[test]
    fn unfolds_and_unescapes_summaries() {
        let events = parse_ics(SAMPLE);
        assert_eq!(events[1].name, "Standup, veckovis(fortsättning)");
        assert_eq!(events[1].end.timestamp() - events[1].start.timestamp(), 15 * 60);
    }

    #[test]
    fn corrupt_timezone_skips_only_that_event() {
        let events = parse_ics(SAMPLE);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.name != "Trasigt möte"));
    }

    #[test]
    fn all_day_events_stay_on_their_day() {
        let events = parse_ics(SAMPLE);
        let ev = events.last().unwrap();
        assert_eq!(ev.name, "Semester");
        assert_eq!(ev.start.naive_local().date(), NaiveDate::from_ymd(2025, 6, 7));
        assert_eq!(ev.end.naive_local().date(), NaiveDate::from_ymd(2025, 6, 7));
        assert_eq!((ev.start.hour(), ev.start.minute()), (0, 0));
        assert_eq!((ev.end.hour(), ev.end.minute()), (23, 59));
    }

    #[test]
    fn event_without_dtstart_is_dropped() {
        let events = parse_ics("BEGIN:VEVENT\r\nSUMMARY:X\r\nEND:VEVENT\r\n");
        assert!(events.is_empty());
    }
}
