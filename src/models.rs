//! Data models for harvested articles, playlists, videos and comments.
//!
//! This module defines the records handed from the scrapers to the writers:
//! - [`ArchiveArticle`]: One scraped article of the presidency archive
//! - [`Playlist`]: Playlist metadata of a channel
//! - [`PlaylistVideo`]: A playlist item flattened to the fields we keep
//! - [`PlaylistVideos`]: Every harvested video of one playlist
//! - [`VideoComments`]: Raw comment threads of one video
//!
//! The wire representations of the video API live next to the client in
//! [`crate::scrapers::youtube`].

use serde::Serialize;

/// A transcript article scraped from the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArticle {
    /// The absolute URL the article was fetched from.
    pub url: String,
    /// Trimmed text of the first `h1`.
    pub h1: String,
    /// Trimmed text of the first `h2`.
    pub h2: String,
    /// Outer HTML of every paragraph in the article body, in document order.
    pub paragraphs: Vec<String>,
}

/// Playlist metadata as listed for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// A playlist item with its snippet and content details merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistVideo {
    pub video_id: String,
    pub title: String,
    pub description: String,
    /// RFC 3339 publication timestamp, as sent by the API.
    pub published_at: String,
    pub position: Option<u64>,
}

/// All harvested videos of one playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistVideos {
    /// Normalized playlist title, used as the output sub-directory.
    pub dir_name: String,
    pub playlist: Playlist,
    pub videos: Vec<PlaylistVideo>,
    /// Whether the harvest ended before the announced total was reached.
    pub truncated: bool,
}

/// Comment threads of one video, kept as raw JSON so they are written verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoComments {
    #[serde(skip)]
    pub dir_name: String,
    pub video_id: String,
    pub title: String,
    pub items: Vec<serde_json::Value>,
}
