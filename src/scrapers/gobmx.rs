//! Presidency article archive scraper.
//!
//! The archive on [gob.mx](https://www.gob.mx/presidencia/es/archivo/articulos)
//! is a paginated listing. Every listing page links to a batch of articles and
//! to the neighbouring listing pages. Transcript articles ("versión
//! estenográfica") are recognised by `estenogra` in their URL.
//!
//! # Pagination
//!
//! A listing page is one harvest [`Page`]: its items are the transcript
//! articles it links to, and its next cursor is the absolute URL of the
//! following listing page (`order=DESC&page=<n+1>`).
//!
//! # URL Pattern
//!
//! Hrefs on the listing are site-relative and sometimes carry literal `\"`
//! sequences left over from escaped markup; those are stripped before the
//! href is resolved against the site host.

use crate::config::ArchiveSettings;
use crate::fetch::BoxError;
use crate::harvest::Page;
use crate::models::ArchiveArticle;
use crate::scrapers::selector;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::{Rng, rng};
use regex::Regex;
use scraper::Html;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

static PAGE_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([?&])page=(\d+)").expect("page parameter pattern is valid"));

const ARTICLE_MARKER: &str = "estenogra";
const PAGE_LINK_MARKER: &str = "order=DESC&page=";

/// Links discovered on one listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLinks {
    /// Absolute transcript URLs, de-duplicated, in document order.
    pub articles: Vec<String>,
    /// Absolute URL of the following listing page, if linked.
    pub next_page: Option<String>,
}

/// Rewrite the `page=` parameter of a listing URL.
pub fn listing_url_for_page(url: &str, page: u32) -> String {
    PAGE_PARAM
        .replace(url, |caps: &regex::Captures<'_>| format!("{}page={page}", &caps[1]))
        .into_owned()
}

/// Extract the `page=` parameter of a listing URL.
pub fn page_number(url: &str) -> Option<u32> {
    PAGE_PARAM
        .captures(url)
        .and_then(|caps| caps[2].parse().ok())
}

/// Collect transcript links and the next-page link from a listing page.
///
/// `current_page` selects which pagination link counts as "next"; when it is
/// unknown the first pagination link found is used.
pub fn parse_listing(
    html: &str,
    base: &Url,
    current_page: Option<u32>,
) -> Result<ListingLinks, BoxError> {
    let document = Html::parse_document(html);
    let link_selector = selector("a[href]")?;

    let mut articles = Vec::new();
    let mut next_page = None;
    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let cleaned = href.replace("\\\"", "");
        let Ok(resolved) = base.join(&cleaned) else {
            debug!(%href, "Skipping unresolvable link");
            continue;
        };
        let resolved = resolved.to_string();

        if resolved.contains(ARTICLE_MARKER) {
            articles.push(resolved);
        } else if next_page.is_none() && resolved.contains(PAGE_LINK_MARKER) {
            let is_next = match current_page {
                Some(current) => page_number(&resolved) == Some(current + 1),
                None => true,
            };
            if is_next {
                next_page = Some(resolved);
            }
        }
    }

    Ok(ListingLinks {
        articles: articles.into_iter().unique().collect(),
        next_page,
    })
}

/// Extract headline, subtitle and body paragraphs from an article page.
pub fn parse_article(url: &str, html: &str) -> Result<ArchiveArticle, BoxError> {
    let document = Html::parse_document(html);
    let first_text = |css: &str| -> Result<Option<String>, BoxError> {
        let sel = selector(css)?;
        Ok(document
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string()))
    };

    let h1 = first_text("h1")?.ok_or("article has no h1")?;
    let h2 = first_text("h2")?.ok_or("article has no h2")?;

    let body_selector = selector("div.article-body")?;
    let paragraph_selector = selector("p")?;
    let body = document
        .select(&body_selector)
        .next()
        .ok_or("article has no div.article-body")?;
    let paragraphs = body.select(&paragraph_selector).map(|p| p.html()).collect();

    Ok(ArchiveArticle {
        url: url.to_string(),
        h1,
        h2,
        paragraphs,
    })
}

/// Scraper bound to one archive listing.
#[derive(Debug, Clone)]
pub struct ArchiveScraper {
    http: reqwest::Client,
    host: Url,
    start_url: String,
    link_delay: Duration,
}

impl ArchiveScraper {
    pub fn new(http: reqwest::Client, settings: &ArchiveSettings) -> Result<Self, BoxError> {
        Ok(Self {
            http,
            host: Url::parse(&settings.host)?,
            start_url: listing_url_for_page(&settings.start_url, settings.start_page),
            link_delay: Duration::from_millis(settings.link_delay_ms),
        })
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Fetch one listing page and every transcript it links to.
    ///
    /// `cursor` is the listing URL handed out by the previous page; `None`
    /// starts at the configured first page. Articles that fail to download or
    /// parse are logged and skipped; a failing listing request is an error.
    #[instrument(level = "info", skip_all, fields(cursor = ?cursor))]
    pub async fn fetch_listing_page(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<ArchiveArticle>, BoxError> {
        let url = cursor.unwrap_or_else(|| self.start_url.clone());
        info!(%url, "Fetching archive listing page");

        let html = self.fetch_text(&url).await?;
        let links = parse_listing(&html, &self.host, page_number(&url))?;
        info!(
            articles = links.articles.len(),
            next = ?links.next_page,
            "Indexed archive listing page"
        );

        let mut page = Page::new(self.fetch_articles(links.articles).await);
        page.next_cursor = links.next_page;
        Ok(page)
    }

    /// Fetch articles one after another, pausing a random interval before each.
    #[instrument(level = "info", skip_all)]
    pub async fn fetch_articles(&self, urls: Vec<String>) -> Vec<ArchiveArticle> {
        let articles: Vec<ArchiveArticle> = stream::iter(urls)
            .then(|url: String| async move {
                self.pause().await;
                match self.fetch_article(&url).await {
                    Ok(article) => {
                        debug!(%url, paragraphs = article.paragraphs.len(), "Fetched archive article");
                        Some(article)
                    }
                    Err(e) => {
                        error!(error = %e, %url, "Archive article fetch failed");
                        None
                    }
                }
            })
            .filter_map(std::future::ready)
            .collect()
            .await;

        info!(count = articles.len(), "Fetched archive article contents");
        articles
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch_article(&self, url: &str) -> Result<ArchiveArticle, BoxError> {
        let html = self.fetch_text(url).await?;
        let article = parse_article(url, &html)?;
        if article.paragraphs.is_empty() {
            warn!("Article body has no paragraphs");
        }
        Ok(article)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, BoxError> {
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    async fn pause(&self) {
        let max_ms = u64::try_from(self.link_delay.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return;
        }
        let ms: u64 = rng().random_range(0..=max_ms);
        sleep(Duration::from_millis(ms)).await;
    }
}
