//! Page-fetch capabilities consumed by the harvester.
//!
//! The harvester never talks to the network itself. It is handed something
//! that implements [`FetchPage`], usually a closure bound to one listing
//! resource and wrapped in [`FnFetch`].
//!
//! # Architecture
//!
//! - [`FetchPage`]: Core trait that turns a cursor into a [`Page`]
//! - [`FnFetch`]: Adapts an async closure into a [`FetchPage`]
//! - [`RetryFetch`]: Decorator that adds exponential backoff to any [`FetchPage`]
//!
//! # Retry Strategy
//!
//! - Configurable number of retry attempts
//! - Exponential backoff from a base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms by default) added to each delay

use crate::harvest::Page;
use rand::{Rng, rng};
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Boxed error type shared by every fetch capability.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Trait for fetching one page of a cursor-paginated listing.
///
/// Implementors receive the cursor returned by the previous page, or `None`
/// for the first page of the listing.
#[allow(async_fn_in_trait)]
pub trait FetchPage {
    /// The item type carried by each page.
    type Item;

    /// Fetch the page addressed by `cursor`.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Self::Item>, BoxError>;
}

/// Adapter that turns an async closure into a [`FetchPage`].
///
/// # Example
///
/// ```ignore
/// let fetch = FnFetch(|cursor| client.playlist_items_page(playlist_id, cursor));
/// let result = Harvester::new(3).harvest(&fetch).await?;
/// ```
pub struct FnFetch<F>(pub F);

impl<F> fmt::Debug for FnFetch<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFetch")
    }
}

impl<F, Fut, T> FetchPage for FnFetch<F>
where
    F: Fn(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, BoxError>>,
{
    type Item = T;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<T>, BoxError> {
        (self.0)(cursor.map(str::to_owned)).await
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchPage`].
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..max_jitter)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetch capability.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap.
    max_delay: StdDuration,
    /// Upper bound of the random jitter added to each delay.
    max_jitter: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchPage,
{
    /// Create a new retry wrapper around an existing [`FetchPage`] implementation.
    ///
    /// # Arguments
    ///
    /// * `inner` - The fetch capability to wrap
    /// * `max_retries` - Retry attempts after the first failure (0 disables retries)
    /// * `base_delay` - Initial delay between retries
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
            max_jitter: StdDuration::from_millis(250),
        }
    }

    /// Override the upper bound of the random jitter.
    pub fn with_max_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_cap = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms: u64 = rng().random_range(0..=jitter_cap);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("max_jitter", &self.max_jitter)
            .finish()
    }
}

impl<T> FetchPage for RetryFetch<T>
where
    T: FetchPage,
{
    type Item = T::Item;

    #[instrument(level = "debug", skip_all, fields(cursor = ?cursor))]
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Self::Item>, BoxError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch_page(cursor).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "fetch_page() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "fetch_page() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
