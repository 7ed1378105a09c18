//! YouTube Data API v3 client.
//!
//! Only the four list endpoints the channel pipeline needs are covered:
//! `channels`, `playlists`, `playlistItems` and `commentThreads`. Each paged
//! endpoint is exposed as a function from an optional `pageToken` to a
//! harvest [`Page`], ready to be wrapped in [`crate::fetch::FnFetch`].
//!
//! # Authentication
//!
//! Requests are authenticated with an API key passed as the `key` query
//! parameter. The key is supplied at runtime (`YOUTUBE_API_KEY`) and is
//! never logged.

use crate::fetch::BoxError;
use crate::harvest::Page;
use crate::models::{Playlist, PlaylistVideo};
use crate::utils::truncate_for_log;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Envelope shared by every `*.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    next_page_token: Option<String>,
    page_info: Option<PageInfo>,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    total_results: Option<u64>,
}

impl<T> ListResponse<T> {
    fn into_page<U>(self, with_total: bool, convert: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(convert).collect(),
            next_cursor: self.next_page_token,
            total_hint: if with_total {
                self.page_info.and_then(|info| info.total_results)
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChannelResource {
    statistics: ChannelStatistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    /// Sent as a decimal string.
    video_count: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistResource {
    id: String,
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
struct PlaylistSnippet {
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemResource {
    snippet: PlaylistItemSnippet,
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    published_at: String,
    title: String,
    #[serde(default)]
    description: String,
    position: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

impl From<PlaylistResource> for Playlist {
    fn from(resource: PlaylistResource) -> Self {
        Self {
            id: resource.id,
            title: resource.snippet.title,
            description: resource.snippet.description,
        }
    }
}

impl From<PlaylistItemResource> for PlaylistVideo {
    fn from(resource: PlaylistItemResource) -> Self {
        Self {
            video_id: resource.content_details.video_id,
            title: resource.snippet.title,
            description: resource.snippet.description,
            published_at: resource.snippet.published_at,
            position: resource.snippet.position,
        }
    }
}

/// Thin client over the list endpoints of the Data API.
#[derive(Clone)]
pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl fmt::Debug for YoutubeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YoutubeClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl YoutubeClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            page_size,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total number of public videos on a channel.
    #[instrument(level = "info", skip(self))]
    pub async fn channel_video_count(&self, channel_id: &str) -> Result<u64, BoxError> {
        let response: ListResponse<ChannelResource> = self
            .list(
                "channels",
                &[
                    ("part", "statistics"),
                    ("id", channel_id),
                    ("fields", "items(statistics(videoCount))"),
                ],
                None,
            )
            .await?;
        let channel = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| format!("channel {channel_id} not found"))?;
        let count = channel.statistics.video_count.parse::<u64>()?;
        debug!(count, "Channel video count");
        Ok(count)
    }

    /// One page of the playlists owned by a channel.
    #[instrument(level = "info", skip(self))]
    pub async fn playlists_page(
        &self,
        channel_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<Playlist>, BoxError> {
        let response: ListResponse<PlaylistResource> = self
            .list(
                "playlists",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    (
                        "fields",
                        "nextPageToken,pageInfo(totalResults),items(id,snippet(title,description))",
                    ),
                ],
                cursor.as_deref(),
            )
            .await?;
        Ok(response.into_page(true, Playlist::from))
    }

    /// One page of the videos of a playlist.
    #[instrument(level = "info", skip(self))]
    pub async fn playlist_items_page(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistVideo>, BoxError> {
        let response: ListResponse<PlaylistItemResource> = self
            .list(
                "playlistItems",
                &[
                    ("part", "snippet,contentDetails"),
                    ("playlistId", playlist_id),
                    (
                        "fields",
                        "nextPageToken,pageInfo(totalResults),items(snippet(publishedAt,title,description,position),contentDetails(videoId))",
                    ),
                ],
                cursor.as_deref(),
            )
            .await?;
        Ok(response.into_page(true, PlaylistVideo::from))
    }

    /// One page of the comment threads of a video, kept as raw JSON.
    ///
    /// `pageInfo.totalResults` of this endpoint counts the current page only,
    /// so no total hint is reported.
    #[instrument(level = "info", skip(self))]
    pub async fn comment_threads_page(
        &self,
        video_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<serde_json::Value>, BoxError> {
        let response: ListResponse<serde_json::Value> = self
            .list(
                "commentThreads",
                &[("part", "snippet,replies"), ("videoId", video_id)],
                cursor.as_deref(),
            )
            .await?;
        Ok(response.into_page(false, |item| item))
    }

    async fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
        cursor: Option<&str>,
    ) -> Result<T, BoxError> {
        let url = format!("{}/{}", self.base_url, resource);
        let page_size = self.page_size.to_string();

        let mut request = self
            .http
            .get(&url)
            .query(params)
            .query(&[("maxResults", page_size.as_str()), ("key", self.api_key.as_str())]);
        if let Some(token) = cursor {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%resource, %status, body = %truncate_for_log(&body, 300), "API request rejected");
            return Err(format!(
                "{resource} request failed with {status}: {}",
                truncate_for_log(&body, 300)
            )
            .into());
        }
        Ok(response.json::<T>().await?)
    }
}
