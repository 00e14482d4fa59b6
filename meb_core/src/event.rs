//! The canonical event record every feed is normalized into.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// When an event takes place.
///
/// All-day events are kept as dates so nothing downstream has to guess them from the shape of a
/// timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTiming {
    Timed {
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
    AllDay {
        date: NaiveDate,
        /// Last day of the event, inclusive.
        last: NaiveDate,
    },
}

impl EventTiming {
    /// The instant the event starts, all-day events starting at local midnight.
    pub fn start(&self, timezone: &Tz) -> DateTime<Utc> {
        match self {
            Self::Timed { start, .. } => *start,
            Self::AllDay { date, .. } => local_midnight(*date, timezone),
        }
    }

    /// The end given by the feed, all-day events ending at the midnight after their last day.
    pub fn end(&self, timezone: &Tz) -> Option<DateTime<Utc>> {
        match self {
            Self::Timed { end, .. } => *end,
            Self::AllDay { last, .. } => last
                .succ_opt()
                .map(|day_after| local_midnight(day_after, timezone)),
        }
    }

    /// The end used for filtering: the explicit end or `start + default_duration`.
    pub fn effective_end(&self, timezone: &Tz, default_duration: Duration) -> DateTime<Utc> {
        self.end(timezone)
            .unwrap_or_else(|| {
                let start = self.start(timezone);
                start
                    .checked_add_signed(default_duration)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            })
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay { .. })
    }
}

/// A cleaned-up event, ready to be filtered and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub title: String,
    pub timing: EventTiming,
    /// The venue, `None` if it is unknown.
    pub location: Option<String>,
    pub link: Option<String>,
}

impl NormalizedEvent {
    pub fn start(&self, timezone: &Tz) -> DateTime<Utc> {
        self.timing.start(timezone)
    }
}

/// Midnight at the beginning of `date` in `timezone`.
///
/// Falls back to UTC midnight for the rare zones where local midnight does not exist.
pub fn local_midnight(date: NaiveDate, timezone: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    timezone
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
