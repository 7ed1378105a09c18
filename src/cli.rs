//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Flags given here override the matching values of the YAML settings file;
//! secrets are read from environment variables.

use archive_harvest::config::{ArchiveSettings, YoutubeSettings};
use archive_harvest::harvest::CapRounding;
use archive_harvest::pipeline::{ChannelRun, OutputMode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the harvester.
///
/// # Examples
///
/// ```sh
/// # Scrape the first 10 archive pages into ./Data_v3
/// archive_harvest archive --max-pages 10
///
/// # Write video descriptions of the default channel
/// YOUTUBE_API_KEY=... archive_harvest youtube -o ./Data
///
/// # Comments only, with settings from a file
/// archive_harvest --config harvest.yaml youtube --output comments
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "ARCHIVE_HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape transcript articles from the presidency archive
    Archive(ArchiveArgs),
    /// Harvest playlists, video descriptions and comments of a channel
    Youtube(YoutubeArgs),
}

#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Output directory for article text files
    #[arg(short, long, default_value = "Data_v3")]
    pub output_dir: PathBuf,

    /// Listing page to start from
    #[arg(long)]
    pub start_page: Option<u32>,

    /// Maximum number of listing pages to visit
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Upper bound in milliseconds of the random pause before each article request
    #[arg(long)]
    pub link_delay_ms: Option<u64>,
}

impl ArchiveArgs {
    pub fn apply(&self, settings: &mut ArchiveSettings) {
        if let Some(start_page) = self.start_page {
            settings.start_page = start_page;
        }
        if let Some(max_pages) = self.max_pages {
            settings.max_pages = max_pages;
        }
        if let Some(delay) = self.link_delay_ms {
            settings.link_delay_ms = delay;
        }
    }
}

#[derive(Args, Debug)]
pub struct YoutubeArgs {
    /// Output directory; one sub-directory per playlist
    #[arg(short, long, default_value = "Data")]
    pub output_dir: PathBuf,

    /// Data API key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Channel to harvest
    #[arg(long)]
    pub channel_id: Option<String>,

    /// Which files to write
    #[arg(long, value_enum, default_value_t = OutputMode::Descriptions)]
    pub output: OutputMode,

    /// Remove the output directory before writing descriptions
    #[arg(long)]
    pub clean: bool,

    /// How the per-playlist page cap is derived from the channel video count
    #[arg(long, value_enum)]
    pub cap_rounding: Option<CapRounding>,

    /// Number of videos per playlist whose comments are fetched
    #[arg(long)]
    pub comment_videos_per_playlist: Option<usize>,

    /// Maximum number of comment pages per video
    #[arg(long)]
    pub max_comment_pages: Option<usize>,
}

impl YoutubeArgs {
    pub fn channel_run(&self) -> ChannelRun {
        ChannelRun {
            output_dir: self.output_dir.clone(),
            api_key: self.api_key.clone(),
            output: self.output,
            clean: self.clean,
        }
    }

    pub fn apply(&self, settings: &mut YoutubeSettings) {
        if let Some(channel_id) = &self.channel_id {
            settings.channel_id = channel_id.clone();
        }
        if let Some(rounding) = self.cap_rounding {
            settings.cap_rounding = rounding;
        }
        if let Some(n) = self.comment_videos_per_playlist {
            settings.comment_videos_per_playlist = n;
        }
        if let Some(n) = self.max_comment_pages {
            settings.max_comment_pages = n;
        }
    }
}
