//! This module reads RSS calendar feeds into raw calendar entries.
//!
//! Calendar RSS items carry their dates as free text in the description, e.g.
//! `<strong>Event date:</strong> January 10, 2025<br><strong>Event Time:</strong> 6:00 PM - 8:00 PM`.
//! Some publishers also add `calendarEvent:*` elements with the same information, which are
//! preferred when present.

use std::sync::OnceLock;

use chrono::Duration;
use chrono_tz::Tz;
use regex::Regex;
use roxmltree::{Document, Node};

use crate::{
    datetext::{local_instant, parse_clock_times, parse_dates},
    entry::{FeedTime, RawCalendarEntry},
    error::Result,
};

fn line_break_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</li>").unwrap())
}

fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"</?[^>]+>").unwrap())
}

fn field_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){label}:\s*([^\n]+)")).unwrap()
}

fn date_field_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| field_regex("Event dates?"))
}

fn time_field_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| field_regex("Event times?"))
}

fn location_field_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| field_regex("Location"))
}

/// Parse an RSS document, one entry per `<item>`.
pub fn parse(xml: &str, timezone: &Tz) -> Result<Vec<RawCalendarEntry>> {
    let document = Document::parse(xml)?;
    let entries = document
        .descendants()
        .filter(|node| node.is_element() && node.tag_name().name() == "item")
        .map(|item| parse_item(item, timezone))
        .collect();
    Ok(entries)
}

/// The trimmed text of the first child element with the given local name.
fn child_text(item: Node, name: &str) -> Option<String> {
    item.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
}

/// Flatten an HTML description into plain text lines.
fn description_lines(description: &str) -> String {
    let with_breaks = line_break_regex().replace_all(description, "\n");
    tag_regex()
        .replace_all(&with_breaks, "")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn capture_field(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .map(|captures| captures[1].trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_item(item: Node, timezone: &Tz) -> RawCalendarEntry {
    let description = child_text(item, "description")
        .map(|description| description_lines(&description))
        .unwrap_or_default();
    let dates_text = child_text(item, "EventDates")
        .or_else(|| capture_field(date_field_regex(), &description));
    let times_text = child_text(item, "EventTimes")
        .or_else(|| capture_field(time_field_regex(), &description));
    let location = child_text(item, "Location")
        .or_else(|| capture_field(location_field_regex(), &description));
    let (start, end) = dates_text
        .map(|dates_text| parse_when(&dates_text, times_text.as_deref(), timezone))
        .unwrap_or((None, None));
    RawCalendarEntry {
        summary: child_text(item, "title"),
        start,
        end,
        location,
        link: child_text(item, "link"),
    }
}

/// Combine the date and time texts of an item into its start and end.
///
/// Without a time the item is an all-day event, spanning to the second date if there is one.
fn parse_when(
    dates_text: &str,
    times_text: Option<&str>,
    timezone: &Tz,
) -> (Option<FeedTime>, Option<FeedTime>) {
    let dates = parse_dates(dates_text);
    let Some(&first_date) = dates.first() else {
        return (None, None);
    };
    let times = times_text.map(parse_clock_times).unwrap_or_default();
    let Some(&start_time) = times.first() else {
        let end = dates
            .get(1)
            .filter(|last| **last > first_date)
            .and_then(|last| last.succ_opt())
            .map(FeedTime::Date);
        return (Some(FeedTime::Date(first_date)), end);
    };
    let Some(start) = local_instant(first_date, start_time, timezone) else {
        return (Some(FeedTime::Date(first_date)), None);
    };
    let end = times
        .get(1)
        .and_then(|end_time| local_instant(first_date, *end_time, timezone))
        .map(|end| {
            // an end before the start runs past midnight
            if end < start {
                end + Duration::days(1)
            } else {
                end
            }
        });
    (Some(FeedTime::Instant(start)), end.map(FeedTime::Instant))
}
