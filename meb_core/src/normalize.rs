//! This module cleans raw feed entries into [`NormalizedEvent`]s.
//!
//! Feeds carry HTML fragments and iCalendar escapes in their text fields, and venue strings with
//! full street addresses. [`clean_location`] cuts those down to the venue name with an ordered
//! list of rules tuned to the village's feed formatting.

use std::sync::OnceLock;

use chrono_tz::Tz;
use regex::Regex;
use tracing::debug;

use crate::{
    entry::{FeedTime, RawCalendarEntry},
    event::{local_midnight, EventTiming, NormalizedEvent},
};

/// Title used when a feed entry has none.
pub static UNTITLED: &str = "Untitled Event";
/// Sentinel for a venue which is not known.
pub static UNKNOWN_LOCATION: &str = "TBA";

/// One step of the location cleanup.
#[derive(Debug, Clone, Copy)]
enum LocationRule {
    /// Keep the text before the first match. Only the first cut rule that matches is applied.
    CutBefore(&'static str),
    /// Remove a match at the end of the text.
    StripSuffix(&'static str),
}

/// The location cleanup rules, in the order they are applied.
static LOCATION_RULES: [(&str, LocationRule); 5] = [
    ("spaced dash", LocationRule::CutBefore(r"\s+[-–—]+\s+")),
    ("comma", LocationRule::CutBefore(",")),
    (
        "municipality",
        LocationRule::StripSuffix(r"(?i)[\s,]*\bRomeoville\s*,?\s*IL\b\.?\s*(?:\d{5}(?:-\d{4})?)?$"),
    ),
    (
        "city state zip",
        LocationRule::StripSuffix(r"(?i)[\s,]+[a-z]+\.?,?\s+[a-z]{2}\.?\s+\d{5}(?:-\d{4})?$"),
    ),
    (
        "state zip",
        LocationRule::StripSuffix(r"(?i)[\s,]+[a-z]{2}\.?\s+\d{5}(?:-\d{4})?$"),
    ),
];

fn compiled_location_rules() -> &'static [(&'static str, LocationRule, Regex)] {
    static RULES: OnceLock<Vec<(&'static str, LocationRule, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        LOCATION_RULES
            .iter()
            .map(|(name, rule)| {
                let pattern = match rule {
                    LocationRule::CutBefore(pattern) | LocationRule::StripSuffix(pattern) => pattern,
                };
                (*name, *rule, Regex::new(pattern).unwrap())
            })
            .collect()
    })
}

fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"</?[^>]+>").unwrap())
}

fn whitespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Remove HTML tags, resolve iCalendar escapes and collapse whitespace.
pub fn clean_text(raw: &str) -> String {
    let without_tags = tag_regex().replace_all(raw, "");
    let unescaped = unescape_ics(&without_tags);
    whitespace_regex()
        .replace_all(&unescaped, " ")
        .trim()
        .to_string()
}

/// Resolve the escapes of iCalendar TEXT values (`\n`, `\N`, `\,`, `\;` and `\\`).
fn unescape_ics(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => unescaped.push(' '),
            Some(escaped @ (',' | ';' | '\\')) => unescaped.push(escaped),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Cut a raw venue string down to the venue name.
///
/// Returns [`UNKNOWN_LOCATION`] when nothing meaningful is left.
pub fn clean_location(raw: &str) -> String {
    let mut location = clean_text(raw);
    let mut cut = false;
    for (name, rule, regex) in compiled_location_rules() {
        match rule {
            LocationRule::CutBefore(_) if cut => continue,
            LocationRule::CutBefore(_) => {
                if let Some(found) = regex.find(&location) {
                    location = location[..found.start()].trim().to_string();
                    cut = true;
                    debug!(rule = *name, location = %location, "cut location");
                }
            }
            LocationRule::StripSuffix(_) => {
                if let Some(found) = regex.find(&location) {
                    location = location[..found.start()].trim().to_string();
                    debug!(rule = *name, location = %location, "stripped location suffix");
                }
            }
        }
    }
    if location
        .chars()
        .filter(|c| !c.is_whitespace())
        .all(|c| matches!(c, '-' | '–' | '—'))
    {
        return UNKNOWN_LOCATION.to_string();
    }
    location
}

/// Map a raw entry to an event, or `None` if it has no usable start.
pub fn normalize_entry(entry: &RawCalendarEntry, timezone: &Tz) -> Option<NormalizedEvent> {
    let timing = match (entry.start?, entry.end) {
        (FeedTime::Instant(start), end) => EventTiming::Timed {
            start,
            end: end.map(|end| match end {
                FeedTime::Instant(end) => end,
                FeedTime::Date(date) => local_midnight(date, timezone),
            }),
        },
        (FeedTime::Date(date), end) => {
            let last = match end {
                // iCalendar all-day ends are exclusive
                Some(FeedTime::Date(end)) => end.pred_opt().unwrap_or(date),
                Some(FeedTime::Instant(end)) => end.with_timezone(timezone).date_naive(),
                None => date,
            };
            EventTiming::AllDay {
                date,
                last: last.max(date),
            }
        }
    };
    let title = entry
        .summary
        .as_deref()
        .map(clean_text)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    let location = entry
        .location
        .as_deref()
        .map(clean_location)
        .filter(|location| location != UNKNOWN_LOCATION);
    let link = entry
        .link
        .as_deref()
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(String::from);
    Some(NormalizedEvent {
        title,
        timing,
        location,
        link,
    })
}

/// Normalize all entries, dropping those without a start.
pub fn normalize_all(entries: &[RawCalendarEntry], timezone: &Tz) -> Vec<NormalizedEvent> {
    entries
        .iter()
        .filter_map(|entry| {
            let event = normalize_entry(entry, timezone);
            if event.is_none() {
                debug!(summary = ?entry.summary, "dropped entry without a start");
            }
            event
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use chrono_tz::America::Chicago;

    use crate::{
        entry::{FeedTime, RawCalendarEntry},
        event::EventTiming,
        normalize::{clean_location, clean_text, normalize_entry, UNKNOWN_LOCATION, UNTITLED},
    };

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("<b>Board</b>   Meeting"), "Board Meeting");
        assert_eq!(
            clean_text(r"Pizza\, Pop\; and Prizes\nfor kids"),
            "Pizza, Pop; and Prizes for kids"
        );
        assert_eq!(clean_text(r"C:\\Temp"), r"C:\Temp");
        assert_eq!(clean_text("  \n "), "");
    }

    #[test]
    fn test_clean_location_village_hall() {
        assert_eq!(
            clean_location("Village Hall - 1050 W Romeoville Rd, Romeoville, IL 60446"),
            "Village Hall"
        );
    }

    #[test]
    fn test_clean_location_dash_variants() {
        for raw in [
            "Recreation Center - 900 W Romeoville Rd",
            "Recreation Center – 900 W Romeoville Rd",
            "Recreation Center — 900 W Romeoville Rd, Romeoville",
            "  <p>Recreation Center</p> -   900 W Romeoville Rd ",
        ] {
            assert_eq!(clean_location(raw), "Recreation Center", "{raw}");
        }
    }

    #[test]
    fn test_clean_location_hyphenated_names_are_kept() {
        assert_eq!(clean_location("Fitness-Center"), "Fitness-Center");
    }

    #[test]
    fn test_clean_location_comma() {
        assert_eq!(
            clean_location(r"Romeoville Athletic & Event Center\, 55 W Phelps Rd"),
            "Romeoville Athletic & Event Center"
        );
        assert_eq!(clean_location("Lukancic Middle School, Room 4"), "Lukancic Middle School");
    }

    #[test]
    fn test_clean_location_suffixes() {
        assert_eq!(clean_location("Village Hall Romeoville IL 60446"), "Village Hall");
        assert_eq!(clean_location("Village Hall Romeoville IL"), "Village Hall");
        assert_eq!(clean_location("Public Library Lockport IL 60441"), "Public Library");
        assert_eq!(
            clean_location("Marquette Park Joliet il 60436-1234"),
            "Marquette Park"
        );
    }

    #[test]
    fn test_clean_location_unknown() {
        assert_eq!(clean_location(""), UNKNOWN_LOCATION);
        assert_eq!(clean_location("   "), UNKNOWN_LOCATION);
        assert_eq!(clean_location("--"), UNKNOWN_LOCATION);
        assert_eq!(clean_location("- -"), UNKNOWN_LOCATION);
        assert_eq!(clean_location(" — – "), UNKNOWN_LOCATION);
        assert_eq!(clean_location("<br/>"), UNKNOWN_LOCATION);
        assert_eq!(clean_location(", Romeoville, IL 60446"), UNKNOWN_LOCATION);
    }

    #[test]
    fn test_clean_location_is_idempotent() {
        for raw in [
            "Village Hall - 1050 W Romeoville Rd, Romeoville, IL 60446",
            "Lukancic Middle School, Room 4",
            "Public Library Lockport IL 60441",
            "Fitness-Center",
            "TBA",
            "",
            "Deer Crossing Park",
        ] {
            let once = clean_location(raw);
            assert_eq!(clean_location(&once), once, "{raw}");
        }
    }

    #[test]
    fn test_normalize_entry() {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 18, 0, 0).unwrap();
        let entry = RawCalendarEntry {
            summary: Some("<strong>Board Meeting</strong>".to_string()),
            start: Some(FeedTime::Instant(start)),
            end: None,
            location: Some("Village Hall - 1050 W Romeoville Rd, Romeoville, IL 60446".to_string()),
            link: Some("  ".to_string()),
        };
        let event = normalize_entry(&entry, &Chicago).unwrap();
        assert_eq!(event.title, "Board Meeting");
        assert_eq!(event.timing, EventTiming::Timed { start, end: None });
        assert_eq!(event.location.as_deref(), Some("Village Hall"));
        assert_eq!(event.link, None);
    }

    #[test]
    fn test_normalize_entry_defaults() {
        let entry = RawCalendarEntry {
            summary: Some("<p> </p>".to_string()),
            start: Some(FeedTime::Date(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())),
            location: Some(" - ".to_string()),
            ..Default::default()
        };
        let event = normalize_entry(&entry, &Chicago).unwrap();
        assert_eq!(event.title, UNTITLED);
        assert_eq!(event.location, None);
    }

    #[test]
    fn test_normalize_entry_without_start() {
        let entry = RawCalendarEntry {
            summary: Some("Leaf Pickup".to_string()),
            ..Default::default()
        };
        assert_eq!(normalize_entry(&entry, &Chicago), None);
    }

    #[test]
    fn test_normalize_entry_all_day_end_is_exclusive() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let entry = RawCalendarEntry {
            start: Some(FeedTime::Date(date)),
            end: Some(FeedTime::Date(NaiveDate::from_ymd_opt(2025, 1, 11).unwrap())),
            ..Default::default()
        };
        let event = normalize_entry(&entry, &Chicago).unwrap();
        assert_eq!(event.timing, EventTiming::AllDay { date, last: date });
    }
}
