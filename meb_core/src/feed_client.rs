//! This client fetches calendar feeds and parses them into raw entries.

use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use tracing::{info, warn};
use url::Url;

use crate::{
    config::FailurePolicy,
    entry::RawCalendarEntry,
    error::{Error, Result},
    ics, rss,
};

static USER_AGENT: &str = concat!("meb/", env!("CARGO_PKG_VERSION"));
/// How many feeds are requested at the same time.
static CONCURRENT_FEEDS: usize = 8;

/// The document types a feed can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Ics,
    Rss,
}

/// Guess the format of a feed from the start of its body.
pub fn sniff(body: &str) -> Option<FeedFormat> {
    let head = body.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("BEGIN:VCALENDAR") {
        return Some(FeedFormat::Ics);
    }
    if head.starts_with("<?xml") || head.starts_with("<rss") || head.starts_with("<feed") {
        return Some(FeedFormat::Rss);
    }
    None
}

/// Build the HTTP client shared by all feed requests.
pub fn client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|source| Error::Http {
            url: String::new(),
            source,
        })
}

/// Get the entries of a single feed.
pub async fn get(client: &Client, url: &Url, timezone: &Tz) -> Result<Vec<RawCalendarEntry>> {
    let response = get_response(client, url).await?;
    let body = response.text().await.map_err(|source| Error::Http {
        url: url.to_string(),
        source,
    })?;
    parse(url, &body, timezone)
}

/// Get the response of a feed, failing on non-success statuses.
async fn get_response(client: &Client, url: &Url) -> Result<Response> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;
    if !response.status().is_success() {
        return Err(Error::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}

/// Parse a feed body with the parser its format calls for.
pub fn parse(url: &Url, body: &str, timezone: &Tz) -> Result<Vec<RawCalendarEntry>> {
    match sniff(body) {
        Some(FeedFormat::Ics) => ics::parse(body, timezone),
        Some(FeedFormat::Rss) => rss::parse(body, timezone),
        None => Err(Error::UnknownFormat(url.to_string())),
    }
}

/// Get the entries of all feeds.
///
/// The feeds are requested concurrently and merged in the order of `urls` once every request is
/// done. How a failing feed is handled depends on `failure_policy`; if every feed fails, so does
/// this function.
pub async fn get_all(
    client: &Client,
    urls: &[Url],
    failure_policy: FailurePolicy,
    timezone: &Tz,
) -> Result<Vec<RawCalendarEntry>> {
    if urls.is_empty() {
        return Err(Error::NoFeeds);
    }
    let results: Vec<_> = stream::iter(urls)
        .map(|url| get(client, url, timezone))
        .buffered(CONCURRENT_FEEDS)
        .collect()
        .await;
    let mut entries = vec![];
    let mut failed = 0;
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(feed_entries) => {
                info!(%url, entries = feed_entries.len(), "fetched feed");
                entries.extend(feed_entries);
            }
            Err(err) if failure_policy == FailurePolicy::Strict => return Err(err),
            Err(err) => {
                warn!(%url, error = %err, "skipping failed feed");
                failed += 1;
            }
        }
    }
    if failed == urls.len() {
        return Err(Error::AllFeedsFailed(failed));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{http::StatusCode, routing::get, Router};
    use chrono_tz::America::Chicago;
    use url::Url;

    use crate::{
        config::FailurePolicy,
        error::Error,
        feed_client::{client, get_all, sniff, FeedFormat},
    };

    /// Serve the test feeds on an ephemeral local port.
    async fn serve_feeds() -> SocketAddr {
        let app = Router::new()
            .route("/village.ics", get(|| async { include_str!("ics/tests/village.ics") }))
            .route("/village.xml", get(|| async { include_str!("rss/tests/village.xml") }))
            .route("/text", get(|| async { "Closed for the holidays." }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }));
        let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .serve(app.into_make_service());
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    fn url(addr: SocketAddr, path: &str) -> Url {
        Url::parse(&format!("http://{addr}{path}")).unwrap()
    }

    #[test]
    fn test_sniff() {
        assert_eq!(sniff("\u{feff}BEGIN:VCALENDAR\r\n"), Some(FeedFormat::Ics));
        assert_eq!(sniff("  <?xml version=\"1.0\"?><rss/>"), Some(FeedFormat::Rss));
        assert_eq!(sniff("<rss version=\"2.0\">"), Some(FeedFormat::Rss));
        assert_eq!(sniff("<!DOCTYPE html>"), None);
    }

    #[tokio::test]
    async fn test_get_all_merges_in_order() {
        let addr = serve_feeds().await;
        let entries = get_all(
            &client().unwrap(),
            &[url(addr, "/village.ics"), url(addr, "/village.xml")],
            FailurePolicy::BestEffort,
            &Chicago,
        )
        .await
        .unwrap();
        assert_eq!(entries.len(), 9);
        assert_eq!(entries[0].summary.as_deref(), Some("Board Meeting"));
        assert_eq!(entries[8].summary.as_deref(), Some("Volunteer Opportunities"));
    }

    #[tokio::test]
    async fn test_get_all_best_effort() {
        let addr = serve_feeds().await;
        let entries = get_all(
            &client().unwrap(),
            &[
                url(addr, "/missing"),
                url(addr, "/text"),
                url(addr, "/village.xml"),
            ],
            FailurePolicy::BestEffort,
            &Chicago,
        )
        .await
        .unwrap();
        assert_eq!(entries.len(), 4);
    }

    #[tokio::test]
    async fn test_get_all_strict() {
        let addr = serve_feeds().await;
        let result = get_all(
            &client().unwrap(),
            &[url(addr, "/village.xml"), url(addr, "/missing")],
            FailurePolicy::Strict,
            &Chicago,
        )
        .await;
        assert!(matches!(result, Err(Error::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_get_all_every_feed_failing() {
        let addr = serve_feeds().await;
        let result = get_all(
            &client().unwrap(),
            &[url(addr, "/missing"), url(addr, "/text")],
            FailurePolicy::BestEffort,
            &Chicago,
        )
        .await;
        assert!(matches!(result, Err(Error::AllFeedsFailed(2))));
    }
}
