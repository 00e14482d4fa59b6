//! Dates and times written out as text, like `January 10, 2025` or `6:00 PM - 8:00 PM`.
//!
//! RSS calendar items and the older `date`/`time` JSON records only carry these free-text forms.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

static MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn month_name_date_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?xi)
                \b(?P<month>[a-z]{3,9})\.? # the month, full or abbreviated
                \s+
                (?P<day>\d{1,2})(?:st|nd|rd|th)?
                ,?\s+
                (?P<year>\d{4})\b
            ",
        )
        .unwrap()
    })
}

fn numeric_date_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?x)
                \b(?:
                    (?P<month>\d{1,2})/(?P<day>\d{1,2})/(?P<year>\d{4}) # US notation
                    |
                    (?P<iso_year>\d{4})-(?P<iso_month>\d{2})-(?P<iso_day>\d{2})
                )\b
            ",
        )
        .unwrap()
    })
}

fn clock_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?i)\b(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<meridiem>[ap])\.?\s?m\b")
            .unwrap()
    })
}

fn twenty_four_hour_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\b(?P<hour>[01]?\d|2[0-3]):(?P<minute>[0-5]\d)\b").unwrap())
}

fn month_number(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .position(|month| month.starts_with(&name))
        .map(|index| index as u32 + 1)
}

/// All dates in `text`, in the order they appear.
pub fn parse_dates(text: &str) -> Vec<NaiveDate> {
    let mut found: Vec<(usize, NaiveDate)> = month_name_date_regex()
        .captures_iter(text)
        .filter_map(|captures| {
            let date = NaiveDate::from_ymd_opt(
                captures["year"].parse().ok()?,
                month_number(&captures["month"])?,
                captures["day"].parse().ok()?,
            )?;
            Some((captures.get(0)?.start(), date))
        })
        .collect();
    found.extend(numeric_date_regex().captures_iter(text).filter_map(|captures| {
        let (year, month, day) = match captures.name("year") {
            Some(year) => (year, captures.name("month")?, captures.name("day")?),
            None => (
                captures.name("iso_year")?,
                captures.name("iso_month")?,
                captures.name("iso_day")?,
            ),
        };
        let date = NaiveDate::from_ymd_opt(
            year.as_str().parse().ok()?,
            month.as_str().parse().ok()?,
            day.as_str().parse().ok()?,
        )?;
        Some((captures.get(0)?.start(), date))
    }));
    found.sort_by_key(|(position, _)| *position);
    found.into_iter().map(|(_, date)| date).collect()
}

/// The first date in `text`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_dates(text).into_iter().next()
}

/// All clock times in `text`, in the order they appear.
///
/// 24-hour times are only considered when there is no `AM`/`PM` time at all.
pub fn parse_clock_times(text: &str) -> Vec<NaiveTime> {
    let twelve_hour: Vec<NaiveTime> = clock_regex()
        .captures_iter(text)
        .filter_map(|captures| {
            let hour: u32 = captures["hour"].parse().ok()?;
            let minute: u32 = captures
                .name("minute")
                .map_or(Some(0), |minute| minute.as_str().parse().ok())?;
            if !(1..=12).contains(&hour) {
                return None;
            }
            let hour = match captures["meridiem"].to_ascii_lowercase().as_str() {
                "p" => hour % 12 + 12,
                _ => hour % 12,
            };
            NaiveTime::from_hms_opt(hour, minute, 0)
        })
        .collect();
    if !twelve_hour.is_empty() {
        return twelve_hour;
    }
    twenty_four_hour_regex()
        .captures_iter(text)
        .filter_map(|captures| {
            NaiveTime::from_hms_opt(
                captures["hour"].parse().ok()?,
                captures["minute"].parse().ok()?,
                0,
            )
        })
        .collect()
}

/// The instant of a local wall-clock time, earliest on ambiguous times.
pub fn local_instant(date: NaiveDate, time: NaiveTime, timezone: &Tz) -> Option<DateTime<Utc>> {
    timezone
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
