//! Merge, filter, sort and cap the events of all feeds.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tracing::info;

use crate::{config::PipelineConfig, event::NormalizedEvent};

/// Run the whole pipeline on the events of all feeds.
///
/// The result has no two events with the same title and start, contains no event which ended
/// before the cutoff, is sorted by start and has at most `config.max_events` elements.
pub fn run(
    events: Vec<NormalizedEvent>,
    config: &PipelineConfig,
    now: DateTime<Utc>,
) -> Vec<NormalizedEvent> {
    let merged = events.len();
    let unique = dedup(events, &config.timezone);
    let deduplicated = unique.len();
    let cutoff = config.cutoff.cutoff(now, &config.timezone);
    let mut upcoming = retain_upcoming(
        unique,
        cutoff,
        &config.timezone,
        config.default_duration,
    );
    let remaining = upcoming.len();
    sort_by_start(&mut upcoming, &config.timezone);
    upcoming.truncate(config.max_events);
    info!(
        merged,
        duplicates = merged - deduplicated,
        ended = deduplicated - remaining,
        kept = upcoming.len(),
        %cutoff,
        "merged events"
    );
    upcoming
}

/// Keep the first event of every title and start.
pub fn dedup(events: Vec<NormalizedEvent>, timezone: &Tz) -> Vec<NormalizedEvent> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert((event.title.clone(), event.start(timezone))))
        .collect()
}

/// Keep the events whose effective end is not before `cutoff`.
pub fn retain_upcoming(
    events: Vec<NormalizedEvent>,
    cutoff: DateTime<Utc>,
    timezone: &Tz,
    default_duration: Duration,
) -> Vec<NormalizedEvent> {
    events
        .into_iter()
        .filter(|event| event.timing.effective_end(timezone, default_duration) >= cutoff)
        .collect()
}

/// Sort by start, keeping the feed order of events starting at the same time.
pub fn sort_by_start(events: &mut [NormalizedEvent], timezone: &Tz) {
    events.sort_by_key(|event| event.start(timezone));
}
