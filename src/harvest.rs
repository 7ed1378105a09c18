//! Bounded cursor harvester.
//!
//! Repeatedly calls a [`FetchPage`] capability, accumulating items in arrival
//! order until the listing is exhausted or a hard page cap is hit. The cap is
//! fixed before the run starts; reaching it with a cursor still pending is
//! logged at `warn` and reported through [`HarvestResult::exit`] and
//! [`HarvestResult::truncated`], never as an error.
//!
//! ```text
//! not started ──▶ in progress ──▶ complete
//!                      │
//!                      └────────▶ truncated
//! ```

use crate::fetch::{BoxError, FetchPage};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items of this page, in listing order.
    pub items: Vec<T>,
    /// Cursor addressing the following page; `None` or empty on the last page.
    pub next_cursor: Option<String>,
    /// Total number of items the listing claims to hold.
    pub total_hint: Option<u64>,
}

impl<T> Page<T> {
    /// A final page with no successor and no total hint.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
            total_hint: None,
        }
    }

    pub fn with_next(mut self, cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(cursor.into());
        self
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total_hint = Some(total);
        self
    }
}

/// Why a harvest stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestExit {
    /// The last page carried no next cursor.
    Exhausted,
    /// `max_pages` fetches were made while a next cursor was still pending.
    PageCap,
    /// A page pointed back at a cursor already visited in this run.
    RepeatedCursor,
}

/// Everything collected from one logical listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestResult<T> {
    /// All items, in the order pages were returned.
    pub items: Vec<T>,
    /// Latest total-count hint seen (or the seeded expectation).
    pub total_hint: Option<u64>,
    /// Number of fetch calls made.
    pub pages_fetched: usize,
    pub exit: HarvestExit,
    /// `true` when fewer items were collected than the total hint announced.
    pub truncated: bool,
}

/// Failures surfaced by [`Harvester::harvest`].
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The page-fetch capability failed; the cause is carried unchanged.
    #[error("failed to fetch page {page} of listing '{listing}': {source}")]
    FetchFailure {
        listing: String,
        /// 1-based index of the failing fetch call.
        page: usize,
        cursor: Option<String>,
        #[source]
        source: BoxError,
    },
}

/// How a page cap is derived from a total count and a page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CapRounding {
    /// `total / page_size`; a trailing partial page is not fetched.
    #[default]
    Floor,
    /// `ceil(total / page_size)`; the trailing partial page is fetched.
    Ceil,
}

/// Derive a page cap from an expected total and a page size.
///
/// A `page_size` of zero yields a cap of zero.
pub fn page_cap(total: u64, page_size: u32, rounding: CapRounding) -> usize {
    if page_size == 0 {
        return 0;
    }
    let size = u64::from(page_size);
    let pages = match rounding {
        CapRounding::Floor => total / size,
        CapRounding::Ceil => total.div_ceil(size),
    };
    usize::try_from(pages).unwrap_or(usize::MAX)
}

/// Bounded, strictly sequential cursor harvester.
#[derive(Debug, Clone)]
pub struct Harvester {
    listing: String,
    max_pages: usize,
    expected_total: Option<u64>,
}

impl Harvester {
    pub fn new(max_pages: usize) -> Self {
        Self {
            listing: "listing".to_string(),
            max_pages,
            expected_total: None,
        }
    }

    /// Name the listing for logs and errors.
    pub fn with_listing(mut self, listing: impl Into<String>) -> Self {
        self.listing = listing.into();
        self
    }

    /// Seed the total-count hint; hints reported by pages replace it.
    pub fn with_expected_total(mut self, total: u64) -> Self {
        self.expected_total = Some(total);
        self
    }

    /// Run the harvest to completion.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::FetchFailure`] as soon as one fetch fails; items
    /// gathered before the failure are discarded.
    #[instrument(level = "info", skip_all, fields(listing = %self.listing, max_pages = self.max_pages))]
    pub async fn harvest<F>(&self, fetch: &F) -> Result<HarvestResult<F::Item>, HarvestError>
    where
        F: FetchPage,
    {
        let mut items = Vec::new();
        let mut total_hint = self.expected_total;
        let mut visited: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut pages_fetched = 0usize;
        let mut exit = HarvestExit::PageCap;

        while pages_fetched < self.max_pages {
            let page = fetch
                .fetch_page(cursor.as_deref())
                .await
                .map_err(|source| HarvestError::FetchFailure {
                    listing: self.listing.clone(),
                    page: pages_fetched + 1,
                    cursor: cursor.clone(),
                    source,
                })?;
            pages_fetched += 1;

            debug!(
                page = pages_fetched,
                items = page.items.len(),
                total_hint = ?page.total_hint,
                has_next = page.next_cursor.is_some(),
                "Fetched page"
            );

            items.extend(page.items);
            if page.total_hint.is_some() {
                total_hint = page.total_hint;
            }

            match page.next_cursor.filter(|c| !c.is_empty()) {
                None => {
                    exit = HarvestExit::Exhausted;
                    break;
                }
                Some(next) => {
                    if let Some(current) = cursor.take() {
                        visited.insert(current);
                    }
                    if visited.contains(&next) {
                        warn!(cursor = %next, page = pages_fetched, "Listing returned an already visited cursor; stopping");
                        exit = HarvestExit::RepeatedCursor;
                        break;
                    }
                    cursor = Some(next);
                }
            }
        }

        let retrieved = items.len() as u64;
        if exit == HarvestExit::PageCap {
            warn!(
                listing = %self.listing,
                retrieved,
                pages_fetched,
                "Page cap reached before the listing ended"
            );
        }
        let truncated = total_hint.is_some_and(|total| retrieved < total);
        if truncated {
            warn!(
                listing = %self.listing,
                retrieved,
                total = ?total_hint,
                pages_fetched,
                ?exit,
                "Not all items of the listing were retrieved"
            );
        } else {
            info!(retrieved, pages_fetched, ?exit, "Harvest complete");
        }

        Ok(HarvestResult {
            items,
            total_hint,
            pages_fetched,
            exit,
            truncated,
        })
    }
}

/// Harvest at most `max_pages` pages from `fetch`.
pub async fn harvest<F>(fetch: &F, max_pages: usize) -> Result<HarvestResult<F::Item>, HarvestError>
where
    F: FetchPage,
{
    Harvester::new(max_pages).harvest(fetch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::error::Error;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Serves pre-built pages keyed by cursor and records every call.
    struct Scripted {
        pages: Vec<(Option<String>, Page<u32>)>,
        calls: RefCell<Vec<Option<String>>>,
    }

    impl Scripted {
        fn new(pages: Vec<(Option<&str>, Page<u32>)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(c, p)| (c.map(str::to_string), p))
                    .collect(),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Option<String>> {
            self.calls.borrow().clone()
        }
    }

    impl FetchPage for Scripted {
        type Item = u32;

        async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<u32>, BoxError> {
            self.calls.borrow_mut().push(cursor.map(str::to_string));
            self.pages
                .iter()
                .find(|(c, _)| c.as_deref() == cursor)
                .map(|(_, p)| p.clone())
                .ok_or_else(|| format!("no page for cursor {cursor:?}").into())
        }
    }

    fn run(start: u32, len: u32) -> Vec<u32> {
        (start..start + len).collect()
    }

    /// Three linked pages of 50 items each; the last page optionally keeps a cursor.
    fn three_pages(total: u64, last_next: Option<&str>) -> Scripted {
        let mut last = Page::new(run(100, 50)).with_total(total);
        last.next_cursor = last_next.map(str::to_string);
        Scripted::new(vec![
            (None, Page::new(run(0, 50)).with_next("p2").with_total(total)),
            (Some("p2"), Page::new(run(50, 50)).with_next("p3").with_total(total)),
            (Some("p3"), last),
        ])
    }

    #[tokio::test]
    async fn test_three_full_pages_complete() {
        let fetch = three_pages(150, None);
        let result = harvest(&fetch, 3).await.unwrap();

        assert_eq!(result.items, run(0, 150));
        assert!(!result.truncated);
        assert_eq!(result.pages_fetched, 3);
        assert_eq!(result.exit, HarvestExit::Exhausted);
        assert_eq!(
            fetch.calls(),
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_cap_reached_with_pending_cursor() {
        let fetch = three_pages(170, Some("p4"));
        let max_pages = page_cap(150, 50, CapRounding::Floor);
        let result = harvest(&fetch, max_pages).await.unwrap();

        assert_eq!(max_pages, 3);
        assert_eq!(fetch.calls().len(), 3);
        assert_eq!(result.items.len(), 150);
        assert_eq!(result.exit, HarvestExit::PageCap);
        assert!(result.truncated);
        assert_eq!(result.total_hint, Some(170));
    }

    #[tokio::test]
    async fn test_cap_reached_but_hint_satisfied_is_not_truncated() {
        let fetch = three_pages(150, Some("p4"));
        let result = harvest(&fetch, 3).await.unwrap();

        assert_eq!(result.exit, HarvestExit::PageCap);
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_cap_smaller_than_listing_stops_early() {
        let fetch = three_pages(150, None);
        let result = harvest(&fetch, 2).await.unwrap();

        assert_eq!(fetch.calls().len(), 2);
        assert_eq!(result.items, run(0, 100));
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_zero_pages_makes_no_calls() {
        let fetch = three_pages(150, None);

        let plain = harvest(&fetch, 0).await.unwrap();
        assert!(plain.items.is_empty());
        assert!(!plain.truncated);
        assert_eq!(plain.pages_fetched, 0);

        let seeded = Harvester::new(0)
            .with_expected_total(10)
            .harvest(&fetch)
            .await
            .unwrap();
        assert!(seeded.items.is_empty());
        assert!(seeded.truncated);

        assert!(fetch.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_next_cursor_ends_listing() {
        let fetch = Scripted::new(vec![
            (None, Page::new(vec![1, 2]).with_next("")),
            (Some(""), Page::new(vec![99])),
        ]);
        let result = harvest(&fetch, 10).await.unwrap();

        assert_eq!(result.items, vec![1, 2]);
        assert_eq!(result.exit, HarvestExit::Exhausted);
        assert_eq!(fetch.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_not_fetched_twice() {
        let fetch = Scripted::new(vec![
            (None, Page::new(vec![1]).with_next("a")),
            (Some("a"), Page::new(vec![2]).with_next("b")),
            (Some("b"), Page::new(vec![3]).with_next("a")),
        ]);
        let result = harvest(&fetch, 10).await.unwrap();

        assert_eq!(result.items, vec![1, 2, 3]);
        assert_eq!(result.exit, HarvestExit::RepeatedCursor);
        assert_eq!(
            fetch.calls(),
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[tokio::test]
    async fn test_self_referencing_cursor_stops() {
        let fetch = Scripted::new(vec![
            (None, Page::new(vec![1]).with_next("a")),
            (Some("a"), Page::new(vec![2]).with_next("a")),
        ]);
        let result = harvest(&fetch, 10).await.unwrap();

        assert_eq!(result.items, vec![1, 2]);
        assert_eq!(result.exit, HarvestExit::RepeatedCursor);
        assert_eq!(fetch.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_latest_total_hint_wins() {
        let fetch = Scripted::new(vec![
            (None, Page::new(vec![1]).with_next("a").with_total(5)),
            (Some("a"), Page::new(vec![2]).with_next("b")),
            (Some("b"), Page::new(vec![3]).with_total(3)),
        ]);
        let result = Harvester::new(10)
            .with_expected_total(100)
            .harvest(&fetch)
            .await
            .unwrap();

        assert_eq!(result.total_hint, Some(3));
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_fetch_failure_carries_cause() {
        let fetch = Scripted::new(vec![(None, Page::new(vec![1]).with_next("missing"))]);
        let err = Harvester::new(5)
            .with_listing("uploads")
            .harvest(&fetch)
            .await
            .unwrap_err();

        let HarvestError::FetchFailure {
            listing,
            page,
            cursor,
            ..
        } = &err;
        assert_eq!(listing, "uploads");
        assert_eq!(*page, 2);
        assert_eq!(cursor.as_deref(), Some("missing"));
        assert_eq!(
            err.source().map(ToString::to_string),
            Some("no page for cursor Some(\"missing\")".to_string())
        );
    }

    #[test]
    fn test_page_cap_rounding() {
        assert_eq!(page_cap(150, 50, CapRounding::Floor), 3);
        assert_eq!(page_cap(170, 50, CapRounding::Floor), 3);
        assert_eq!(page_cap(170, 50, CapRounding::Ceil), 4);
        assert_eq!(page_cap(49, 50, CapRounding::Floor), 0);
        assert_eq!(page_cap(49, 50, CapRounding::Ceil), 1);
        assert_eq!(page_cap(0, 50, CapRounding::Ceil), 0);
        assert_eq!(page_cap(100, 0, CapRounding::Floor), 0);
    }

    /// Shared sink for formatted log lines.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn install(&self) -> tracing::subscriber::DefaultGuard {
            let writer = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::INFO)
                .finish();
            tracing::subscriber::set_default(subscriber)
        }

        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn unhinted_pages() -> Scripted {
        Scripted::new(vec![
            (None, Page::new(vec![1, 2]).with_next("b")),
            (Some("b"), Page::new(vec![3, 4]).with_next("c")),
            (Some("c"), Page::new(vec![5])),
        ])
    }

    #[tokio::test]
    async fn test_cap_without_hint_warns() {
        let logs = LogBuffer::default();
        let _guard = logs.install();

        let result = Harvester::new(2)
            .with_listing("archive")
            .harvest(&unhinted_pages())
            .await
            .unwrap();

        assert_eq!(result.exit, HarvestExit::PageCap);
        assert_eq!(result.total_hint, None);
        assert!(!result.truncated);

        let output = logs.contents();
        let line = output
            .lines()
            .find(|l| l.contains("Page cap reached before the listing ended"))
            .expect("cap warning logged");
        assert!(line.contains("WARN"));
        assert!(line.contains("listing=archive"));
    }

    #[tokio::test]
    async fn test_exhausted_listing_does_not_warn() {
        let logs = LogBuffer::default();
        let _guard = logs.install();

        let result = harvest(&unhinted_pages(), 5).await.unwrap();

        assert_eq!(result.exit, HarvestExit::Exhausted);
        let output = logs.contents();
        assert!(!output.contains("WARN"));
        assert!(output.contains("Harvest complete"));
    }
}
