use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::{
    datetext::{local_instant, parse_clock_times, parse_date},
    error::Result,
    event::local_midnight,
    normalize::{UNKNOWN_LOCATION, UNTITLED},
};

static LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// One element of the events file.
///
/// Both the current `{title, start, end, location}` layout and the older
/// `{title, date, time, location, link}` one are accepted.
/// A field of the wrong type is read as missing instead of dropping the record. Numbers are
/// shown as text, numeric `start`/`end` values are milliseconds since the epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "lenient_instant")]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub all_day: bool,
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    })
}

fn lenient_instant<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|millis| millis as i64))
            .and_then(DateTime::from_timestamp_millis)
            .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true)),
        _ => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// An event as the display shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEvent {
    pub title: String,
    pub location: String,
    /// The legacy `date` text, shown as is.
    pub display_date: Option<String>,
    /// The legacy `time` text, shown as is.
    pub display_time: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
}

/// Read the events file.
///
/// A document which is not an array holds no events; array elements which are not objects are
/// skipped.
pub fn parse_feed_json(text: &str) -> Result<Vec<FeedRecord>> {
    let Value::Array(items) = serde_json::from_str::<Value>(text)? else {
        return Ok(vec![]);
    };
    let records = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(error = %err, "skipped malformed record");
                None
            }
        })
        .collect();
    Ok(records)
}

/// Read a date the way a browser's `Date` constructor would, `None` if it is not one.
fn parse_date_safe(text: &str, timezone: &Tz) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(instant) = DateTime::parse_from_rfc2822(text) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return timezone
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc));
        }
    }
    let date = parse_date(text)?;
    match parse_clock_times(text).first() {
        Some(time) => local_instant(date, *time, timezone),
        None => Some(local_midnight(date, timezone)),
    }
}

/// Turn a record into a display event, whatever layout it has.
///
/// Events without an end are assumed to last `default_duration`.
pub fn normalize_record(record: &FeedRecord, timezone: &Tz, default_duration: Duration) -> DisplayEvent {
    let mut start = record
        .start
        .as_deref()
        .and_then(|start| parse_date_safe(start, timezone));
    let mut end = record
        .end
        .as_deref()
        .and_then(|end| parse_date_safe(end, timezone));
    if start.is_none() {
        if let Some(date) = record.date.as_deref().and_then(parse_date) {
            let times = record
                .time
                .as_deref()
                .map(parse_clock_times)
                .unwrap_or_default();
            start = match times.first() {
                Some(time) => local_instant(date, *time, timezone),
                None => Some(local_midnight(date, timezone)),
            };
            if end.is_none() {
                end = times
                    .get(1)
                    .and_then(|time| local_instant(date, *time, timezone))
                    .filter(|end| start.is_some_and(|start| *end > start));
            }
        }
    }
    if end.is_none() {
        end = start.and_then(|start| start.checked_add_signed(default_duration));
    }
    let non_empty = |text: &Option<String>| {
        text.as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(String::from)
    };
    DisplayEvent {
        title: non_empty(&record.title).unwrap_or_else(|| UNTITLED.to_string()),
        location: non_empty(&record.location).unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        display_date: non_empty(&record.date),
        display_time: non_empty(&record.time),
        start,
        end,
        all_day: record.all_day,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use chrono_tz::America::Chicago;

    use crate::display::record::{normalize_record, parse_date_safe, parse_feed_json, FeedRecord};

    #[test]
    fn test_parse_feed_json() {
        let records = parse_feed_json(
            r#"[
                {"title": "Board Meeting", "start": "2025-01-11T00:00:00.000Z", "end": null, "location": "Village Hall"},
                {"title": "Leaf Collection", "start": "2025-01-13T06:00:00.000Z", "end": "2025-01-14T06:00:00.000Z", "allDay": true},
                {"title": "Concert", "date": "July 11, 2025", "time": "7:30 PM", "location": "RAEC", "link": "https://example.org"},
                {"title": 42},
                "not a record"
            ]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 4);
        assert!(records[1].all_day);
        assert_eq!(records[2].time.as_deref(), Some("7:30 PM"));
        assert_eq!(records[3].title.as_deref(), Some("42"));
    }

    #[test]
    fn test_parse_feed_json_wrongly_typed_fields() {
        let records = parse_feed_json(
            r#"[
                {"title": ["Board", "Meeting"], "start": 1736553600000, "location": 7, "allDay": "yes"},
                {"title": null, "start": {"when": "soon"}, "end": true}
            ]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, None);
        assert_eq!(records[0].start.as_deref(), Some("2025-01-11T00:00:00.000Z"));
        assert_eq!(records[0].location.as_deref(), Some("7"));
        assert!(!records[0].all_day);
        assert_eq!(records[1], FeedRecord::default());

        let event = normalize_record(&records[0], &Chicago, Duration::hours(2));
        assert_eq!(event.title, "Untitled Event");
        assert_eq!(event.start, Some(Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_parse_feed_json_not_an_array() {
        assert_eq!(parse_feed_json(r#"{"events": []}"#).unwrap(), vec![]);
        assert!(parse_feed_json("<html>").is_err());
    }

    #[test]
    fn test_parse_date_safe() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap();
        for text in [
            "2025-01-11T00:00:00.000Z",
            "2025-01-10T18:00:00-06:00",
            "Fri, 10 Jan 2025 18:00:00 -0600",
            "2025-01-10 18:00",
            "January 10, 2025 6:00 PM",
        ] {
            assert_eq!(parse_date_safe(text, &Chicago), Some(expected), "{text}");
        }
        assert_eq!(parse_date_safe("", &Chicago), None);
        assert_eq!(parse_date_safe("soon", &Chicago), None);
    }

    #[test]
    fn test_normalize_record_canonical() {
        let record = FeedRecord {
            title: Some("Board Meeting".to_string()),
            start: Some("2025-01-11T00:00:00.000Z".to_string()),
            ..Default::default()
        };
        let event = normalize_record(&record, &Chicago, Duration::hours(2));
        assert_eq!(event.location, "TBA");
        assert_eq!(event.end, Some(Utc.with_ymd_and_hms(2025, 1, 11, 2, 0, 0).unwrap()));
        assert_eq!(event.display_date, None);
    }

    #[test]
    fn test_normalize_record_legacy() {
        let record = FeedRecord {
            title: Some("  ".to_string()),
            date: Some("January 10, 2025".to_string()),
            time: Some("6:00 PM - 7:30 PM".to_string()),
            location: Some("Village Hall".to_string()),
            ..Default::default()
        };
        let event = normalize_record(&record, &Chicago, Duration::hours(2));
        assert_eq!(event.title, "Untitled Event");
        assert_eq!(event.start, Some(Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap()));
        assert_eq!(event.end, Some(Utc.with_ymd_and_hms(2025, 1, 11, 1, 30, 0).unwrap()));
        assert_eq!(event.display_date.as_deref(), Some("January 10, 2025"));
        assert_eq!(event.display_time.as_deref(), Some("6:00 PM - 7:30 PM"));
    }

    #[test]
    fn test_normalize_record_undated() {
        let event = normalize_record(&FeedRecord::default(), &Chicago, Duration::hours(2));
        assert_eq!(event.start, None);
        assert_eq!(event.end, None);
    }
}
