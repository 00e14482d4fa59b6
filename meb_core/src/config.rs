//! Settings of a batch run and where the feed URLs come from.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use url::Url;

use crate::{
    error::{Error, Result},
    event::local_midnight,
};

/// The environment variable holding a comma-separated list of feed URLs.
pub static FEEDS_ENV: &str = "MEB_FEED_URLS";

/// The feeds read when neither arguments nor the environment name any.
pub static DEFAULT_FEEDS: [&str; 1] =
    ["https://www.romeoville.org/RSSFeed.aspx?ModID=58&CID=All-calendar.xml"];

pub static DEFAULT_TIMEZONE: &str = "America/Chicago";
pub static DEFAULT_MAX_EVENTS: usize = 20;
pub static DEFAULT_DURATION_MINUTES: i64 = 120;
/// The longest assumed event length, one year.
pub static MAX_DURATION_MINUTES: i64 = 365 * 24 * 60;

/// Which instant decides whether an event is over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CutoffPolicy {
    /// Keep everything which has not ended before local midnight today.
    #[default]
    StartOfDay,
    /// Keep only what has not ended yet.
    Now,
}

impl CutoffPolicy {
    pub fn cutoff(&self, now: DateTime<Utc>, timezone: &Tz) -> DateTime<Utc> {
        match self {
            Self::StartOfDay => local_midnight(now.with_timezone(timezone).date_naive(), timezone),
            Self::Now => now,
        }
    }
}

/// What to do when a single feed cannot be fetched or parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log it and go on without that feed's events.
    #[default]
    BestEffort,
    /// Abort the whole run.
    Strict,
}

/// How an unknown venue is written to the JSON file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LocationPolicy {
    /// Leave out the `location` field.
    #[default]
    Omit,
    /// Write the `TBA` sentinel.
    Sentinel,
}

/// Settings of the merge/filter/sort pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_events: usize,
    /// Assumed length of events without an end.
    pub default_duration: Duration,
    pub cutoff: CutoffPolicy,
    /// The zone of "today" and of floating feed times.
    pub timezone: Tz,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            default_duration: Duration::minutes(DEFAULT_DURATION_MINUTES),
            cutoff: CutoffPolicy::default(),
            timezone: chrono_tz::America::Chicago,
        }
    }
}

/// Look up an IANA time zone by name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| Error::InvalidTimezone(name.to_string()))
}

/// Parse a feed URL, reading `webcal://` as `https://`.
pub fn parse_feed_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let rewritten = match raw.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => raw.to_string(),
    };
    Url::parse(&rewritten).map_err(|source| Error::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Decide which feeds to read.
///
/// The arguments win over the comma-separated environment value, which wins over the fallback
/// list. Blank items are ignored, any unparsable URL is an error.
pub fn resolve_feeds(arguments: &[String], env: Option<&str>, fallback: &[&str]) -> Result<Vec<Url>> {
    let from_arguments: Vec<&str> = arguments
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .collect();
    let from_env: Vec<&str> = env
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .collect();
    let chosen: &[&str] = if !from_arguments.is_empty() {
        &from_arguments
    } else if !from_env.is_empty() {
        &from_env
    } else {
        fallback
    };
    if chosen.is_empty() {
        return Err(Error::NoFeeds);
    }
    chosen.iter().map(|url| parse_feed_url(url)).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::America::Chicago;

    use crate::{
        config::{parse_feed_url, parse_timezone, resolve_feeds, CutoffPolicy, DEFAULT_FEEDS},
        error::Error,
    };

    #[test]
    fn test_resolve_feeds_priority() {
        let arguments = vec!["https://a.example/cal.ics".to_string()];
        let env = Some("https://b.example/cal.ics, https://c.example/cal.ics");

        let urls = resolve_feeds(&arguments, env, &DEFAULT_FEEDS).unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].host_str(), Some("a.example"));

        let urls = resolve_feeds(&[], env, &DEFAULT_FEEDS).unwrap();
        let hosts: Vec<_> = urls.iter().filter_map(|url| url.host_str()).collect();
        assert_eq!(hosts, vec!["b.example", "c.example"]);

        let urls = resolve_feeds(&[], Some(" , "), &DEFAULT_FEEDS).unwrap();
        assert_eq!(urls[0].host_str(), Some("www.romeoville.org"));
    }

    #[test]
    fn test_resolve_feeds_errors() {
        assert!(matches!(resolve_feeds(&[], None, &[]), Err(Error::NoFeeds)));
        assert!(matches!(
            resolve_feeds(&["not a url".to_string()], None, &[]),
            Err(Error::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_parse_feed_url_webcal() {
        let url = parse_feed_url("webcal://www.romeoville.org/calendar.ics").unwrap();
        assert_eq!(url.as_str(), "https://www.romeoville.org/calendar.ics");
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("America/Chicago").unwrap(), Chicago);
        assert!(matches!(
            parse_timezone("Mars/Olympus"),
            Err(Error::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_cutoff() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 3, 30, 0).unwrap();
        // 21:30 on January 9th in Chicago
        assert_eq!(
            CutoffPolicy::StartOfDay.cutoff(now, &Chicago),
            Utc.with_ymd_and_hms(2025, 1, 9, 6, 0, 0).unwrap()
        );
        assert_eq!(CutoffPolicy::Now.cutoff(now, &Chicago), now);
    }
}
