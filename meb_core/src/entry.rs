//! Raw entries as they come out of a feed, before any cleanup.

use chrono::{DateTime, NaiveDate, Utc};

/// A date-like value read from a feed.
///
/// Anything a feed carries that does not look like a date never becomes a `FeedTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTime {
    Instant(DateTime<Utc>),
    Date(NaiveDate),
}

/// One event-like item of a feed.
///
/// The strings are untouched and may still contain markup or iCalendar escapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCalendarEntry {
    pub summary: Option<String>,
    pub start: Option<FeedTime>,
    pub end: Option<FeedTime>,
    pub location: Option<String>,
    pub link: Option<String>,
}
