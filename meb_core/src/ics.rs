//! This module reads iCalendar feeds into raw calendar entries.

use std::{
    io::{BufReader, Cursor},
    sync::OnceLock,
};

use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::{parser::ical::component::IcalEvent, property::Property, IcalParser};
use regex::Regex;
use tracing::debug;

use crate::{
    entry::{FeedTime, RawCalendarEntry},
    error::{Error, Result},
};

static DATE_FORMAT: &str = "%Y%m%d";
static DATE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

trait GetIcalProperty {
    fn get_ical_property(&self, name: &str) -> Option<&Property>;

    fn get_ical_property_value(&self, name: &str) -> Option<&String> {
        self.get_ical_property(name)
            .and_then(|property| property.value.as_ref())
    }
}

impl GetIcalProperty for IcalEvent {
    fn get_ical_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|property| property.name.eq_ignore_ascii_case(name))
    }
}

/// Get the first value of a property parameter.
fn get_param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(|value| value.trim_matches('"'))
}

/// Parse an iCalendar document.
///
/// Only `VEVENT`s are read, cancelled ones are skipped. Floating times are taken to be in the
/// calendar's `X-WR-TIMEZONE`, or `timezone` if it has none.
pub fn parse(ics: &str, timezone: &Tz) -> Result<Vec<RawCalendarEntry>> {
    let parser = IcalParser::new(BufReader::new(Cursor::new(ics)));
    let mut entries = vec![];
    for ical_calendar_result in parser {
        let ical_calendar = ical_calendar_result.map_err(|err| Error::Ics(err.to_string()))?;
        let calendar_timezone = ical_calendar
            .properties
            .iter()
            .find(|property| property.name.eq_ignore_ascii_case("X-WR-TIMEZONE"))
            .and_then(|property| property.value.as_deref())
            .and_then(|name| name.trim().parse::<Tz>().ok())
            .unwrap_or(*timezone);
        for ical_event in &ical_calendar.events {
            if ical_event
                .get_ical_property_value("STATUS")
                .is_some_and(|status| status.eq_ignore_ascii_case("CANCELLED"))
            {
                debug!(summary = ?ical_event.get_ical_property_value("SUMMARY"), "skipped cancelled event");
                continue;
            }
            entries.push(parse_event(ical_event, &calendar_timezone));
        }
    }
    Ok(entries)
}

fn parse_event(ical_event: &IcalEvent, timezone: &Tz) -> RawCalendarEntry {
    let start = ical_event
        .get_ical_property("DTSTART")
        .and_then(|property| parse_time(property, timezone));
    let end = ical_event
        .get_ical_property("DTEND")
        .and_then(|property| parse_time(property, timezone))
        .or_else(|| {
            let duration = parse_duration(ical_event.get_ical_property_value("DURATION")?)?;
            match start? {
                FeedTime::Instant(start) => start.checked_add_signed(duration).map(FeedTime::Instant),
                FeedTime::Date(date) => date
                    .checked_add_signed(duration)
                    .map(FeedTime::Date),
            }
        });
    RawCalendarEntry {
        summary: ical_event.get_ical_property_value("SUMMARY").cloned(),
        start,
        end,
        location: ical_event.get_ical_property_value("LOCATION").cloned(),
        link: ical_event.get_ical_property_value("URL").cloned(),
    }
}

/// Read a `DTSTART`/`DTEND` property, `None` if its value is not a date.
fn parse_time(property: &Property, timezone: &Tz) -> Option<FeedTime> {
    let value = property.value.as_deref()?.trim();
    if get_param(property, "VALUE").is_some_and(|kind| kind.eq_ignore_ascii_case("DATE"))
        || value.len() == 8
    {
        return NaiveDate::parse_from_str(value, DATE_FORMAT)
            .ok()
            .map(FeedTime::Date);
    }
    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, DATE_TIME_FORMAT).ok()?;
        return Some(FeedTime::Instant(Utc.from_utc_datetime(&naive)));
    }
    let naive = NaiveDateTime::parse_from_str(value, DATE_TIME_FORMAT).ok()?;
    let zone = get_param(property, "TZID")
        .and_then(|tzid| tzid.parse::<Tz>().ok())
        .unwrap_or(*timezone);
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|local| FeedTime::Instant(local.with_timezone(&Utc)))
}

fn duration_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"(?x)
                ^P
                (?:(?P<weeks>\d+)W)?
                (?:(?P<days>\d+)D)?
                (?:T
                    (?:(?P<hours>\d+)H)?
                    (?:(?P<minutes>\d+)M)?
                    (?:(?P<seconds>\d+)S)?
                )?$
            ",
        )
        .unwrap()
    })
}

/// Parse a non-negative iCalendar `DURATION` like `PT1H30M` or `P1D`, `None` if it is out of
/// range.
fn parse_duration(value: &str) -> Option<Duration> {
    let captures = duration_regex().captures(value.trim())?;
    let amount = |name: &str| -> Option<i64> {
        captures
            .name(name)
            .map_or(Some(0), |amount| amount.as_str().parse().ok())
    };
    Duration::try_weeks(amount("weeks")?)?
        .checked_add(&Duration::try_days(amount("days")?)?)?
        .checked_add(&Duration::try_hours(amount("hours")?)?)?
        .checked_add(&Duration::try_minutes(amount("minutes")?)?)?
        .checked_add(&Duration::try_seconds(amount("seconds")?)?)
}
