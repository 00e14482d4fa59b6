//! This module writes the final events to the JSON file the display reads.

use std::{fs, path::Path};

use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::LocationPolicy,
    error::Result,
    event::NormalizedEvent,
    normalize::UNKNOWN_LOCATION,
};

pub static DEFAULT_OUTPUT: &str = "events.json";

/// One element of the JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub title: String,
    /// ISO-8601 instant in UTC.
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Format an instant the way browsers print `Date.toISOString()`.
pub fn iso_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl EventRecord {
    pub fn from_event(event: &NormalizedEvent, timezone: &Tz, location_policy: LocationPolicy) -> Self {
        let location = match (&event.location, location_policy) {
            (Some(location), _) => Some(location.clone()),
            (None, LocationPolicy::Sentinel) => Some(UNKNOWN_LOCATION.to_string()),
            (None, LocationPolicy::Omit) => None,
        };
        Self {
            title: event.title.clone(),
            start: Some(iso_instant(event.timing.start(timezone))),
            end: event.timing.end(timezone).map(iso_instant),
            location,
            all_day: event.timing.is_all_day(),
            link: event.link.clone(),
        }
    }
}

/// Serialize the events as a pretty-printed JSON array.
pub fn to_json(
    events: &[NormalizedEvent],
    timezone: &Tz,
    location_policy: LocationPolicy,
) -> Result<String> {
    let records: Vec<EventRecord> = events
        .iter()
        .map(|event| EventRecord::from_event(event, timezone, location_policy))
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Replace the file at `path` with the events.
///
/// The JSON goes to a sibling `.tmp` file first, which is then renamed over `path`, so a reader
/// never sees a half-written file.
pub fn write(
    path: &Path,
    events: &[NormalizedEvent],
    timezone: &Tz,
    location_policy: LocationPolicy,
) -> Result<()> {
    let json = to_json(events, timezone, location_policy)?;
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");
    fs::write(&temporary, json)?;
    if let Err(err) = fs::rename(&temporary, path) {
        if let Err(remove_err) = fs::remove_file(&temporary) {
            warn!(path = ?temporary, error = %remove_err, "failed to remove temporary file");
        }
        return Err(err.into());
    }
    info!(path = %path.display(), events = events.len(), "wrote events");
    Ok(())
}
