//! Display-side logic of the signage page.
//!
//! The page loads the events file, pages through it on a timer, refetches it every hour and
//! reloads itself shortly after midnight. Everything here is plain data so the browser shell
//! only has to move it into the DOM.

mod format;
mod pager;
mod record;

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;

pub use format::{format_date, format_time};
pub use pager::{fit_scale, paginate, FitStep, RendererState};
pub use record::{normalize_record, parse_feed_json, DisplayEvent, FeedRecord};

use crate::{datetext::local_instant, event::local_midnight};

/// Shown in the status line when the events file could not be loaded.
pub static FAILED_MESSAGE: &str = "Failed to load events.";
/// Shown instead of an empty page.
pub static EMPTY_MESSAGE: &str = "No upcoming events found.";
pub static LOADING_MESSAGE: &str = "Loading…";
/// Shown for a date or time which is not known.
pub static UNKNOWN: &str = "TBA";

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub events_url: String,
    pub events_per_page: usize,
    pub max_events: usize,
    pub page_duration: StdDuration,
    pub refresh_every: StdDuration,
    pub hard_reload_at_midnight: bool,
    /// Assumed length of events without an end.
    pub default_duration: Duration,
    pub timezone: Tz,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            events_url: String::from("events.json"),
            events_per_page: 5,
            max_events: 20,
            page_duration: StdDuration::from_secs(12),
            refresh_every: StdDuration::from_secs(60 * 60),
            hard_reload_at_midnight: true,
            default_duration: Duration::hours(2),
            timezone: chrono_tz::America::Chicago,
        }
    }
}

/// Normalize, filter, sort and cap the records of the events file.
///
/// Events are kept unless they ended before local midnight today. Records without any date are
/// kept and sorted last.
pub fn prepare(records: &[FeedRecord], config: &DisplayConfig, now: DateTime<Utc>) -> Vec<DisplayEvent> {
    let start_of_day = local_midnight(now.with_timezone(&config.timezone).date_naive(), &config.timezone);
    let mut events: Vec<DisplayEvent> = records
        .iter()
        .map(|record| normalize_record(record, &config.timezone, config.default_duration))
        .filter(|event| match (event.end, event.start) {
            (Some(end), _) => end >= start_of_day,
            (None, Some(start)) => start >= start_of_day,
            (None, None) => true,
        })
        .collect();
    events.sort_by_key(|event| (event.start.is_none(), event.start));
    events.truncate(config.max_events);
    events
}

/// Time until two seconds past the next local midnight.
pub fn until_midnight_reload(now: DateTime<Utc>, timezone: &Tz) -> StdDuration {
    let reload_at = now
        .with_timezone(timezone)
        .date_naive()
        .succ_opt()
        .zip(NaiveTime::from_hms_opt(0, 0, 2))
        .and_then(|(tomorrow, time)| local_instant(tomorrow, time, timezone));
    reload_at
        .and_then(|reload_at| (reload_at - now).to_std().ok())
        .unwrap_or(StdDuration::from_secs(24 * 60 * 60))
}

/// The status line shown after a successful load.
pub fn status_line(count: usize, now: DateTime<Utc>, timezone: &Tz) -> String {
    format!(
        "{count} upcoming event{} • updated {}",
        if count == 1 { "" } else { "s" },
        now.with_timezone(timezone).format("%-I:%M:%S %p")
    )
}

/// Add a query parameter which keeps caches from answering the request.
pub fn cache_bust(url: &str, now: DateTime<Utc>) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}_={}", now.timestamp_millis())
}
