//! Runtime settings loaded from an optional YAML file.
//!
//! Every field carries a default so a partial file (or no file at all) is
//! valid. Command-line flags override individual values after loading.
//!
//! ```yaml
//! http:
//!   user_agent: "archive_harvest/0.1"
//!   retries: 3
//! archive:
//!   max_pages: 50
//!   link_delay_ms: 500
//! youtube:
//!   channel_id: "UCxEgOKuI-n-WOJaNcisHvSg"
//!   cap_rounding: ceil
//! ```

use crate::harvest::CapRounding;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

pub const DEFAULT_ARCHIVE_URL: &str = "https://www.gob.mx/presidencia/es/archivo/articulos?filter_id=&filter_origin=archive&idiom=es&order=DESC&page=1&style=list&tags=&utf8=%E2%9C%93";
pub const DEFAULT_ARCHIVE_HOST: &str = "https://www.gob.mx";
pub const DEFAULT_YOUTUBE_API: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_CHANNEL_ID: &str = "UCxEgOKuI-n-WOJaNcisHvSg";
/// Largest `maxResults` the Data API list endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub archive: ArchiveSettings,
    pub youtube: YoutubeSettings,
}

/// HTTP client and retry settings shared by both pipelines.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Extra attempts after a failed page fetch.
    pub retries: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
            retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

impl HttpSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Listing URL of the first archive page; its `page=` parameter is rewritten.
    pub start_url: String,
    /// Base that relative article and page links are resolved against.
    pub host: String,
    pub start_page: u32,
    pub max_pages: usize,
    /// Upper bound of the random pause taken before each article request.
    pub link_delay_ms: u64,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_ARCHIVE_URL.to_string(),
            host: DEFAULT_ARCHIVE_HOST.to_string(),
            start_page: 1,
            max_pages: 211,
            link_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    pub api_base_url: String,
    pub channel_id: String,
    pub page_size: u32,
    pub cap_rounding: CapRounding,
    pub max_playlist_pages: usize,
    pub comment_videos_per_playlist: usize,
    pub max_comment_pages: usize,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_YOUTUBE_API.to_string(),
            channel_id: DEFAULT_CHANNEL_ID.to_string(),
            page_size: 50,
            cap_rounding: CapRounding::Floor,
            max_playlist_pages: 1,
            comment_videos_per_playlist: 1,
            max_comment_pages: 1,
        }
    }
}

impl Settings {
    /// Reject values the Data API would refuse on every request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let page_size = self.youtube.page_size;
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ConfigError::Invalid {
                key: "youtube.page_size",
                reason: format!("{page_size} is outside 1..={MAX_PAGE_SIZE}"),
            });
        }
        Ok(())
    }

    /// Parse settings from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Load settings from `path`, or fall back to defaults when no path is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or holds
    /// an out-of-range value.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let settings = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml(
            "archive:\n  max_pages: 5\nyoutube:\n  cap_rounding: ceil\n  page_size: 25\n",
        )
        .unwrap();

        assert_eq!(settings.archive.max_pages, 5);
        assert_eq!(settings.archive.start_url, DEFAULT_ARCHIVE_URL);
        assert_eq!(settings.youtube.cap_rounding, CapRounding::Ceil);
        assert_eq!(settings.youtube.page_size, 25);
        assert_eq!(settings.youtube.channel_id, DEFAULT_CHANNEL_ID);
        assert_eq!(settings.http, HttpSettings::default());
    }

    #[test]
    fn test_empty_mapping_is_default() {
        assert_eq!(Settings::from_yaml("{}").unwrap(), Settings::default());
    }

    #[test]
    fn test_unknown_rounding_is_rejected() {
        assert!(Settings::from_yaml("youtube:\n  cap_rounding: nearest\n").is_err());
    }

    #[tokio::test]
    async fn test_load_reports_missing_file() {
        let err = Settings::load(Some(Path::new("/definitely/not/here.yaml")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_load_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "http:\n  retries: 0\n").unwrap();

        let settings = Settings::load(Some(&path)).await.unwrap();
        assert_eq!(settings.http.retries, 0);
        assert_eq!(settings.http.request_timeout_secs, 30);
    }

    #[test]
    fn test_default_page_size_is_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_out_of_range_page_size() {
        let tmp = tempfile::tempdir().unwrap();
        for value in ["0", "51"] {
            let path = tmp.path().join(format!("page_size_{value}.yaml"));
            std::fs::write(&path, format!("youtube:\n  page_size: {value}\n")).unwrap();

            let err = Settings::load(Some(&path)).await.unwrap_err();
            let ConfigError::Invalid { key, .. } = &err else {
                panic!("expected invalid setting, got {err:?}");
            };
            assert_eq!(*key, "youtube.page_size");
            assert!(err.to_string().contains(&format!("{value} is outside 1..=50")));
        }
    }
}
