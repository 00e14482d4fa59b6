use chrono_tz::Tz;

use crate::display::{record::DisplayEvent, UNKNOWN};

static DATE_FORMAT: &str = "%a, %b %-d, %Y";
static TIME_FORMAT: &str = "%-I:%M %p";

/// The date line of an event, e.g. `Fri, Jan 10, 2025`.
pub fn format_date(event: &DisplayEvent, timezone: &Tz) -> String {
    if let Some(display_date) = &event.display_date {
        return display_date.clone();
    }
    event
        .start
        .map(|start| start.with_timezone(timezone).format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// The time line of an event, e.g. `6:00 PM – 8:00 PM`.
pub fn format_time(event: &DisplayEvent, timezone: &Tz) -> String {
    if let Some(display_time) = &event.display_time {
        return display_time.clone();
    }
    if event.all_day {
        return String::from("All day");
    }
    let Some(start) = event.start else {
        return UNKNOWN.to_string();
    };
    let start_text = start.with_timezone(timezone).format(TIME_FORMAT).to_string();
    match event.end {
        Some(end) => format!(
            "{start_text} – {}",
            end.with_timezone(timezone).format(TIME_FORMAT)
        ),
        None => start_text,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::America::Chicago;

    use crate::display::{
        format::{format_date, format_time},
        record::DisplayEvent,
    };

    fn event() -> DisplayEvent {
        DisplayEvent {
            title: "Board Meeting".to_string(),
            location: "Village Hall".to_string(),
            display_date: None,
            display_time: None,
            start: Some(Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2025, 1, 11, 2, 0, 0).unwrap()),
            all_day: false,
        }
    }

    #[test]
    fn test_format_in_display_timezone() {
        let event = event();
        assert_eq!(format_date(&event, &Chicago), "Fri, Jan 10, 2025");
        assert_eq!(format_time(&event, &Chicago), "6:00 PM – 8:00 PM");
    }

    #[test]
    fn test_format_legacy_text_wins() {
        let event = DisplayEvent {
            display_date: Some("January 10, 2025".to_string()),
            display_time: Some("6 PM".to_string()),
            ..event()
        };
        assert_eq!(format_date(&event, &Chicago), "January 10, 2025");
        assert_eq!(format_time(&event, &Chicago), "6 PM");
    }

    #[test]
    fn test_format_all_day_and_undated() {
        let all_day = DisplayEvent {
            all_day: true,
            ..event()
        };
        assert_eq!(format_time(&all_day, &Chicago), "All day");
        let undated = DisplayEvent {
            start: None,
            end: None,
            ..event()
        };
        assert_eq!(format_date(&undated, &Chicago), "TBA");
        assert_eq!(format_time(&undated, &Chicago), "TBA");
    }
}
