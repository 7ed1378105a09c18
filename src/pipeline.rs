//! End-to-end runs of the two sources.
//!
//! - [`run_archive`]: listing pages of the presidency archive, each page's
//!   transcripts written to disk as soon as the page is harvested
//! - [`run_youtube`]: channel video count, one page cap for every playlist,
//!   playlist items, then description and comment files

use crate::config::{HttpSettings, Settings};
use crate::fetch::{BoxError, FetchPage, FnFetch, RetryFetch};
use crate::harvest::{HarvestExit, Harvester, Page, page_cap};
use crate::models::{PlaylistVideos, VideoComments};
use crate::outputs;
use crate::scrapers::{gobmx::ArchiveScraper, youtube::YoutubeClient};
use crate::utils::{ensure_writable_dir, normalize_for_filename};
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// What the channel run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    Descriptions,
    Comments,
    All,
}

impl OutputMode {
    pub fn descriptions(self) -> bool {
        matches!(self, Self::Descriptions | Self::All)
    }

    pub fn comments(self) -> bool {
        matches!(self, Self::Comments | Self::All)
    }
}

/// Per-invocation inputs of a channel run that do not live in [`Settings`].
#[derive(Clone)]
pub struct ChannelRun {
    pub output_dir: PathBuf,
    pub api_key: String,
    pub output: OutputMode,
    /// Remove `output_dir` before writing descriptions.
    pub clean: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub pages_fetched: usize,
    pub exit: HarvestExit,
    /// Transcript files in the order they were written.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport {
    pub video_count: u64,
    /// Page cap applied to every playlist.
    pub cap: usize,
    /// Harvested playlists, in listing order.
    pub playlists: Vec<PlaylistVideos>,
    pub descriptions_written: usize,
    pub comment_files: Vec<PathBuf>,
}

/// Wrap a fetch capability with the configured retry policy.
fn retrying<F: FetchPage>(fetch: F, http: &HttpSettings) -> RetryFetch<F> {
    RetryFetch::new(fetch, http.retries, http.retry_base_delay())
}

/// Harvest the presidency archive, writing each listing page's transcripts
/// before the next page is requested.
///
/// # Errors
///
/// A listing page that still fails after retries ends the run; files of the
/// pages before it stay on disk.
#[instrument(level = "info", skip_all, fields(outdir = %outdir.display()))]
pub async fn run_archive(
    http: reqwest::Client,
    settings: &Settings,
    outdir: &Path,
) -> Result<ArchiveReport, BoxError> {
    ensure_writable_dir(outdir).await?;

    let scraper = ArchiveScraper::new(http, &settings.archive)?;
    info!(start_url = %scraper.start_url(), max_pages = settings.archive.max_pages, "Harvesting archive");

    let scraper = &scraper;
    let listing = retrying(
        FnFetch(move |cursor| scraper.fetch_listing_page(cursor)),
        &settings.http,
    );
    let listing = &listing;
    // Only the listing request is retried; a failed write ends the run.
    let fetch = FnFetch(move |cursor: Option<String>| async move {
        let page = listing.fetch_page(cursor.as_deref()).await?;
        let files = outputs::articles::write_articles(outdir, &page.items).await?;
        Ok::<_, BoxError>(Page {
            items: files,
            next_cursor: page.next_cursor,
            total_hint: page.total_hint,
        })
    });

    let result = Harvester::new(settings.archive.max_pages)
        .with_listing("presidency archive")
        .harvest(&fetch)
        .await?;

    info!(
        pages = result.pages_fetched,
        exit = ?result.exit,
        files = result.items.len(),
        "Archive harvest finished"
    );
    Ok(ArchiveReport {
        pages_fetched: result.pages_fetched,
        exit: result.exit,
        files: result.items,
    })
}

/// Harvest a channel's playlists and videos, then write descriptions and/or comments.
#[instrument(level = "info", skip_all, fields(outdir = %run.output_dir.display(), output = ?run.output))]
pub async fn run_youtube(
    http: reqwest::Client,
    settings: &Settings,
    run: &ChannelRun,
) -> Result<ChannelReport, BoxError> {
    let yt = &settings.youtube;
    ensure_writable_dir(&run.output_dir).await?;

    let client = YoutubeClient::new(http, &yt.api_base_url, &run.api_key, yt.page_size);
    let client = &client;
    let channel_id = yt.channel_id.as_str();

    // The cap is fixed up front from the channel total, never per playlist.
    let video_count = client.channel_video_count(channel_id).await?;
    let cap = page_cap(video_count, client.page_size(), yt.cap_rounding);
    info!(%channel_id, video_count, cap, rounding = ?yt.cap_rounding, "Derived playlist page cap");

    let playlists = Harvester::new(yt.max_playlist_pages)
        .with_listing(format!("playlists of {channel_id}"))
        .harvest(&retrying(
            FnFetch(move |cursor| client.playlists_page(channel_id, cursor)),
            &settings.http,
        ))
        .await?;
    info!(count = playlists.items.len(), "Listed playlists");

    let mut harvested: Vec<PlaylistVideos> = Vec::with_capacity(playlists.items.len());
    for playlist in playlists.items {
        let playlist_id = playlist.id.as_str();
        let result = Harvester::new(cap)
            .with_listing(playlist.title.clone())
            .harvest(&retrying(
                FnFetch(move |cursor| client.playlist_items_page(playlist_id, cursor)),
                &settings.http,
            ))
            .await?;

        harvested.push(PlaylistVideos {
            dir_name: normalize_for_filename(&playlist.title),
            videos: result.items,
            truncated: result.truncated,
            playlist,
        });
    }

    let truncated = harvested.iter().filter(|p| p.truncated).count();
    if truncated > 0 {
        warn!(truncated, playlists = harvested.len(), "Some playlists were only partially retrieved");
    }

    let descriptions_written = if run.output.descriptions() {
        outputs::videos::write_video_descriptions(&run.output_dir, &harvested, run.clean).await?
    } else {
        0
    };

    let comment_files = if run.output.comments() {
        let comments = harvest_comments(client, settings, &harvested).await;
        let written = outputs::videos::write_video_comments(&run.output_dir, &comments).await?;
        info!(files = written.len(), "Comment files were written");
        written
    } else {
        Vec::new()
    };

    Ok(ChannelReport {
        video_count,
        cap,
        playlists: harvested,
        descriptions_written,
        comment_files,
    })
}

/// Harvest comment threads of the first videos of every playlist.
///
/// Videos whose comments cannot be listed (disabled comments, quota) are
/// logged and skipped.
#[instrument(level = "info", skip_all)]
pub async fn harvest_comments(
    client: &YoutubeClient,
    settings: &Settings,
    playlists: &[PlaylistVideos],
) -> Vec<VideoComments> {
    let yt = &settings.youtube;
    let mut comments = Vec::new();

    for playlist in playlists {
        for video in playlist.videos.iter().take(yt.comment_videos_per_playlist) {
            let video_id = video.video_id.as_str();
            let result = Harvester::new(yt.max_comment_pages)
                .with_listing(format!("comments of {video_id}"))
                .harvest(&retrying(
                    FnFetch(move |cursor| client.comment_threads_page(video_id, cursor)),
                    &settings.http,
                ))
                .await;

            match result {
                Ok(result) => comments.push(VideoComments {
                    dir_name: playlist.dir_name.clone(),
                    video_id: video.video_id.clone(),
                    title: video.title.clone(),
                    items: result.items,
                }),
                Err(e) => {
                    error!(error = %e, playlist = %playlist.dir_name, %video_id, "Comment harvest failed; skipping video");
                }
            }
        }
    }

    info!(videos = comments.len(), "Harvested comment threads");
    comments
}
