//! Sources the pipelines harvest from.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Pagination |
//! |--------|--------|--------|------------|
//! | Presidency archive | [`gobmx`] | HTML scraping | next-page links used as cursors |
//! | Video channel | [`youtube`] | Data API v3 | `pageToken` cursors |
//!
//! Both modules expose page-fetch functions meant to be wrapped in
//! [`crate::fetch::FnFetch`] and driven by [`crate::harvest::Harvester`].

use crate::config::HttpSettings;
use crate::fetch::BoxError;
use scraper::Selector;

pub mod gobmx;
pub mod youtube;

/// Build the HTTP client shared by every request of a run.
pub fn http_client(settings: &HttpSettings) -> Result<reqwest::Client, BoxError> {
    let client = reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .timeout(settings.request_timeout())
        .build()?;
    Ok(client)
}

/// Parse a CSS selector, turning the borrowed parse error into an owned one.
pub(crate) fn selector(css: &str) -> Result<Selector, BoxError> {
    Selector::parse(css).map_err(|e| format!("invalid selector {css:?}: {e}").into())
}
