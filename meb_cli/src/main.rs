use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use clap::{Parser, ValueEnum};
use meb_core::{
    config::{
        parse_timezone, resolve_feeds, CutoffPolicy, FailurePolicy, LocationPolicy, PipelineConfig,
        DEFAULT_DURATION_MINUTES, DEFAULT_FEEDS, DEFAULT_MAX_EVENTS, DEFAULT_TIMEZONE, FEEDS_ENV,
        MAX_DURATION_MINUTES,
    },
    feed_client,
    normalize::normalize_all,
    output::{self, DEFAULT_OUTPUT},
    pipeline,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(about = "Fetch calendar feeds and write the upcoming events as JSON")]
pub struct Arguments {
    /// the feed URLs, overriding MEB_FEED_URLS
    pub feeds: Vec<String>,
    /// do not fall back to the built-in feeds
    #[arg(long)]
    pub no_default_feeds: bool,
    /// the file to write
    #[arg(long, env = "MEB_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,
    /// the most events to write
    #[arg(long, env = "MEB_MAX_EVENTS", default_value_t = DEFAULT_MAX_EVENTS)]
    pub max_events: usize,
    /// which events count as past
    #[arg(long, env = "MEB_CUTOFF", value_enum, default_value_t = Cutoff::StartOfDay)]
    pub cutoff: Cutoff,
    /// the assumed length of events without an end
    #[arg(
        long,
        env = "MEB_DEFAULT_DURATION_MINUTES",
        default_value_t = DEFAULT_DURATION_MINUTES,
        value_parser = clap::value_parser!(i64).range(1..=MAX_DURATION_MINUTES)
    )]
    pub default_duration_minutes: i64,
    /// the time zone of the calendars
    #[arg(long, env = "MEB_TIMEZONE", default_value = DEFAULT_TIMEZONE, value_parser = parse_timezone)]
    pub timezone: Tz,
    /// what to do when a feed fails
    #[arg(long, env = "MEB_FAILURE_POLICY", value_enum, default_value_t = Failure::BestEffort)]
    pub failure_policy: Failure,
    /// how to write unknown locations
    #[arg(long, env = "MEB_LOCATION_POLICY", value_enum, default_value_t = Location::Omit)]
    pub location_policy: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Cutoff {
    /// drop events which ended before midnight
    StartOfDay,
    /// drop events which already ended
    Now,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Failure {
    /// skip failing feeds
    BestEffort,
    /// abort on the first failing feed
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Location {
    /// leave the location out
    Omit,
    /// write "TBA"
    Sentinel,
}

impl From<Cutoff> for CutoffPolicy {
    fn from(value: Cutoff) -> Self {
        match value {
            Cutoff::StartOfDay => CutoffPolicy::StartOfDay,
            Cutoff::Now => CutoffPolicy::Now,
        }
    }
}

impl From<Failure> for FailurePolicy {
    fn from(value: Failure) -> Self {
        match value {
            Failure::BestEffort => FailurePolicy::BestEffort,
            Failure::Strict => FailurePolicy::Strict,
        }
    }
}

impl From<Location> for LocationPolicy {
    fn from(value: Location) -> Self {
        match value {
            Location::Omit => LocationPolicy::Omit,
            Location::Sentinel => LocationPolicy::Sentinel,
        }
    }
}

impl From<&Arguments> for PipelineConfig {
    fn from(value: &Arguments) -> Self {
        PipelineConfig {
            max_events: value.max_events,
            default_duration: Duration::minutes(value.default_duration_minutes),
            cutoff: value.cutoff.into(),
            timezone: value.timezone,
        }
    }
}

fn init_logging() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set up logging")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let args = Arguments::parse();
    let fallback: &[&str] = if args.no_default_feeds {
        &[]
    } else {
        &DEFAULT_FEEDS
    };
    let urls = resolve_feeds(&args.feeds, env::var(FEEDS_ENV).ok().as_deref(), fallback)?;
    info!(feeds = urls.len(), "fetching feeds");
    let config = PipelineConfig::from(&args);
    let client = feed_client::client()?;
    let entries = feed_client::get_all(
        &client,
        &urls,
        args.failure_policy.into(),
        &config.timezone,
    )
    .await?;
    let events = normalize_all(&entries, &config.timezone);
    let events = pipeline::run(events, &config, Utc::now());
    output::write(
        &args.output,
        &events,
        &config.timezone,
        args.location_policy.into(),
    )
    .with_context(|| format!("failed to write {}", args.output.display()))?;
    Ok(())
}
