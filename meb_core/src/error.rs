//! Error types for fetching, parsing and writing event feeds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[cfg(feature = "fetch")]
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{0} is neither an iCalendar nor an RSS document")]
    UnknownFormat(String),

    #[error("iCalendar parse error: {0}")]
    Ics(String),

    #[error("RSS parse error: {0}")]
    Rss(#[from] roxmltree::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid feed URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no feed URLs configured")]
    NoFeeds,

    #[error("all {0} feeds failed")]
    AllFeedsFailed(usize),

    #[error("unknown time zone {0:?}")]
    InvalidTimezone(String),
}

pub type Result<T> = std::result::Result<T, Error>;
