//! This crate turns municipal calendar feeds into a small JSON file for a signage display.
//! It also holds the display-side logic which pages through that file.
//!
//! The batch side reads iCalendar and RSS feeds, normalizes the events, drops duplicates and past
//! events, and writes at most a configured number of them, sorted by start.

pub mod config;
pub mod datetext;
pub mod display;
pub mod entry;
pub mod error;
pub mod event;
#[cfg(feature = "fetch")]
pub mod feed_client;
pub mod ics;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod rss;

pub use error::{Error, Result};
